pub mod cli;
pub mod configuration;
pub mod connection;
pub mod dispatcher;
pub mod logging;
pub mod message_id;
#[cfg(test)]
pub(crate) mod test_utils;
