pub(crate) mod stream_controller;
