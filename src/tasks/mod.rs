pub(crate) mod sampling_responder;
