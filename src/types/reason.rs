/// Outcome of one (contract, provider) proof check. The numeric values are
/// persisted and served to clients; they must never be reassigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub(crate) enum ReasonCode {
    ValidStorageProof = 0,
    /// Provider address could not be resolved
    IpNotFound = 101,
    /// Initial default before any check
    NotFound = 102,
    /// Skipped after too many consecutive failures
    UnavailableProvider = 103,
    /// Gateway session to the storage node could not be opened
    CantCreatePeer = 104,
    /// Unexpected peer response shape
    UnknownPeer = 105,
    PingFailed = 201,
    InvalidBagId = 202,
    FailedInitialPing = 203,
    /// Torrent-info query failed
    GetInfoFailed = 301,
    /// Torrent-info parse failed or its hash does not match the bag id
    InvalidHeader = 302,
    CantGetPiece = 401,
    CantParseBoc = 402,
    ProofCheckFailed = 403,
}

impl ReasonCode {
    pub(crate) fn as_i16(self) -> i16 {
        self as i16
    }

    pub(crate) fn from_i16(raw: i16) -> Option<Self> {
        match raw {
            0 => Some(Self::ValidStorageProof),
            101 => Some(Self::IpNotFound),
            102 => Some(Self::NotFound),
            103 => Some(Self::UnavailableProvider),
            104 => Some(Self::CantCreatePeer),
            105 => Some(Self::UnknownPeer),
            201 => Some(Self::PingFailed),
            202 => Some(Self::InvalidBagId),
            203 => Some(Self::FailedInitialPing),
            301 => Some(Self::GetInfoFailed),
            302 => Some(Self::InvalidHeader),
            401 => Some(Self::CantGetPiece),
            402 => Some(Self::CantParseBoc),
            403 => Some(Self::ProofCheckFailed),
            _ => None,
        }
    }

    /// Stable machine-readable label served by the contracts-status API.
    pub(crate) fn label(self) -> &'static str {
        match self {
            Self::ValidStorageProof => "valid_storage_proof",
            Self::IpNotFound => "ip_not_found",
            Self::NotFound => "not_found",
            Self::UnavailableProvider => "unavailable_provider",
            Self::CantCreatePeer => "cant_create_peer",
            Self::UnknownPeer => "unknown_peer",
            Self::PingFailed => "ping_failed",
            Self::InvalidBagId => "invalid_bag_id",
            Self::FailedInitialPing => "failed_initial_ping",
            Self::GetInfoFailed => "get_info_failed",
            Self::InvalidHeader => "invalid_header",
            Self::CantGetPiece => "cant_get_piece",
            Self::CantParseBoc => "cant_parse_boc",
            Self::ProofCheckFailed => "proof_check_failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_values_are_stable() {
        assert_eq!(ReasonCode::ValidStorageProof.as_i16(), 0);
        assert_eq!(ReasonCode::IpNotFound.as_i16(), 101);
        assert_eq!(ReasonCode::NotFound.as_i16(), 102);
        assert_eq!(ReasonCode::UnavailableProvider.as_i16(), 103);
        assert_eq!(ReasonCode::CantCreatePeer.as_i16(), 104);
        assert_eq!(ReasonCode::UnknownPeer.as_i16(), 105);
        assert_eq!(ReasonCode::PingFailed.as_i16(), 201);
        assert_eq!(ReasonCode::InvalidBagId.as_i16(), 202);
        assert_eq!(ReasonCode::FailedInitialPing.as_i16(), 203);
        assert_eq!(ReasonCode::GetInfoFailed.as_i16(), 301);
        assert_eq!(ReasonCode::InvalidHeader.as_i16(), 302);
        assert_eq!(ReasonCode::CantGetPiece.as_i16(), 401);
        assert_eq!(ReasonCode::CantParseBoc.as_i16(), 402);
        assert_eq!(ReasonCode::ProofCheckFailed.as_i16(), 403);
    }

    #[test]
    fn from_i16_round_trips_known_codes() {
        for code in [0, 101, 102, 103, 104, 105, 201, 202, 203, 301, 302, 401, 402, 403] {
            let reason = ReasonCode::from_i16(code).unwrap();
            assert_eq!(reason.as_i16(), code);
            assert!(!reason.label().is_empty());
        }
        assert!(ReasonCode::from_i16(999).is_none());
    }
}
