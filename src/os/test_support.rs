//! Shared row-building helpers for tracker unit tests.

use super::ffi::MibTcpRow;

/// A v4 row with the given local/remote ports, in the network-byte-order
/// encoding `iphlpapi` actually uses.
pub fn v4_row(local_port: u16, remote_port: u16) -> MibTcpRow {
    MibTcpRow {
        dwState: 5, // ESTABLISHED
        dwLocalAddr: 0x0100_0001,
        dwLocalPort: local_port.to_be() as u32,
        dwRemoteAddr: 0x0200_0001,
        dwRemotePort: remote_port.to_be() as u32,
    }
}

/// Build the raw byte buffer for an arbitrary `#[repr(C)]` struct, the way
/// the FFI layer itself marshals RW/ROS/ROD blocks.
pub unsafe fn struct_bytes<T: Copy>(value: &T) -> Vec<u8> {
    std::slice::from_raw_parts(value as *const T as *const u8, std::mem::size_of::<T>()).to_vec()
}
