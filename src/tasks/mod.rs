// Console LED Trigger - Network tasks

pub mod mqtt;
pub mod network;
