pub(crate) mod http_api_controller;
