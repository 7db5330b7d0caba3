//! EEPROM Programmer Serial File Protocol
//!
//! This crate provides the wire format and both conversation roles of the
//! protocol that lets the eeprommer3 programmer read and write files that live
//! on the host computer. The programmer is the requester; the host answers.
//!
//! # Protocol Overview
//!
//! Every message is a frame of one length byte, one opcode byte and up to 255
//! payload bytes. One file session exists at a time and walks through
//! FILEOPEN, FILECONF, any number of FILESIZE/FILESEEK/FILEREAD/FILEWRIT/
//! FILEFLUS, and finally FILECLOS. PING may be sent whenever no file is open.
//!
//! # Example
//!
//! ```rust,ignore
//! use eeprommer_protocol::{AccessMode, FileClient};
//!
//! let mut client = FileClient::new(port);
//! client.open("Load EEPROM image", true)?;
//! client.configure(AccessMode::READ)?;
//! let size = client.size()?;
//! let head = client.read(16)?;
//! client.close()?;
//! ```

mod access;
mod client;
mod constants;
mod error;
mod frame;

pub use access::*;
pub use client::*;
pub use constants::*;
pub use error::*;
pub use frame::*;
