//! Echoes the last message back.

use plume::prelude::*;

pub struct EchoBot;

impl EchoBot {
    fn get_response(self: Arc<Self>, messages: Vec<ProtocolMessage>) -> String {
        messages
            .last()
            .map(|message| message.content.clone())
            .unwrap_or_default()
    }
}

impl ServerBot for EchoBot {
    fn response_handler() -> ResponseHandler<Self> {
        ResponseHandler::blocking_single(Param::new("messages"), Self::get_response)
    }
}
