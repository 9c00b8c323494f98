// windsim - NMEA-0183 wind and GPS instrument simulator
// Encodes wind/position sentences and streams them over TCP, UDP and a loopback relay

pub mod nmea;
pub mod relay;
pub mod sim;
pub mod simulator;
pub mod transport;
