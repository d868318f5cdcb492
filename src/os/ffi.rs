//! Raw `iphlpapi.dll` bindings: connection-table enumeration and the
//! per-connection ESTATS Set/Get calls. Hand-declared the same way the
//! teacher's own netstat collector hand-declares `GetExtendedTcpTable` and
//! friends, rather than pulling in the full `Win32_NetworkManagement_IpHelper`
//! feature surface for a handful of calls.

use crate::estats::Family;
use crate::identity::{Endpoint, Identity};

pub const AF_INET: u32 = 2;
pub const AF_INET6: u32 = 23;
const TCP_TABLE_OWNER_PID_ALL: u32 = 5;

/// `TCP_ESTATS_TYPE` discriminants this crate cares about; order matches
/// `Tcpestats.h`.
pub fn estats_type(family: Family) -> i32 {
    match family {
        Family::SynOpts => 0,
        Family::Data => 1,
        Family::SendCongestion => 2,
        Family::Path => 3,
        Family::LocalRwin => 5,
        Family::RemoteRwin => 6,
        Family::Bandwidth => 7,
    }
}

/// Row passed to `Set/GetPerTcpConnectionEStats` (IPv4). Network-byte-order
/// fields straight from the connection table, no host-order conversion.
#[derive(Debug, Clone, Copy)]
#[repr(C)]
#[allow(non_snake_case)]
pub struct MibTcpRow {
    pub dwState: u32,
    pub dwLocalAddr: u32,
    pub dwLocalPort: u32,
    pub dwRemoteAddr: u32,
    pub dwRemotePort: u32,
}

impl MibTcpRow {
    pub fn identity(&self) -> Identity {
        Identity::new(
            Endpoint::v4(self.dwLocalAddr.to_ne_bytes(), port_from_raw(self.dwLocalPort)),
            Endpoint::v4(self.dwRemoteAddr.to_ne_bytes(), port_from_raw(self.dwRemotePort)),
        )
    }
}

impl crate::os::RawRow {
    pub(crate) fn v4(row: MibTcpRow) -> Self {
        crate::os::RawRow::V4(row)
    }
    pub(crate) fn v6(row: MibTcp6Row) -> Self {
        crate::os::RawRow::V6(row)
    }
}

/// Row passed to `Set/GetPerTcp6ConnectionEStats` (IPv6).
#[derive(Debug, Clone, Copy)]
#[repr(C)]
#[allow(non_snake_case)]
pub struct MibTcp6Row {
    pub State: u32,
    pub LocalAddr: [u8; 16],
    pub dwLocalScopeId: u32,
    pub dwLocalPort: u32,
    pub RemoteAddr: [u8; 16],
    pub dwRemoteScopeId: u32,
    pub dwRemotePort: u32,
}

impl MibTcp6Row {
    pub fn identity(&self) -> Identity {
        Identity::new(
            Endpoint::v6(self.LocalAddr, port_from_raw(self.dwLocalPort)),
            Endpoint::v6(self.RemoteAddr, port_from_raw(self.dwRemotePort)),
        )
    }
}

/// `iphlpapi` stores the port in the low 16 bits of the `ULONG` field, in
/// network byte order.
fn port_from_raw(raw: u32) -> u16 {
    u16::from_be((raw & 0xFFFF) as u16)
}

// ── GetExtendedTcpTable row layouts (OWNER_PID variants, used only for
//    enumeration — the plain MIB_TCPROW/MIB_TCP6ROW above is what gets
//    passed back into the ESTATS calls) ──

#[repr(C)]
#[allow(non_snake_case)]
struct MibTcpRowOwnerPid {
    dwState: u32,
    dwLocalAddr: u32,
    dwLocalPort: u32,
    dwRemoteAddr: u32,
    dwRemotePort: u32,
    dwOwningPid: u32,
}

#[repr(C)]
#[allow(non_snake_case)]
struct MibTcpTableOwnerPid {
    dwNumEntries: u32,
    table: [MibTcpRowOwnerPid; 1],
}

#[repr(C)]
#[allow(non_snake_case)]
struct MibTcp6RowOwnerPid {
    ucLocalAddr: [u8; 16],
    dwLocalScopeId: u32,
    dwLocalPort: u32,
    ucRemoteAddr: [u8; 16],
    dwRemoteScopeId: u32,
    dwRemotePort: u32,
    dwState: u32,
    dwOwningPid: u32,
}

#[repr(C)]
#[allow(non_snake_case)]
struct MibTcp6TableOwnerPid {
    dwNumEntries: u32,
    table: [MibTcp6RowOwnerPid; 1],
}

#[link(name = "iphlpapi")]
extern "system" {
    fn GetExtendedTcpTable(
        pTcpTable: *mut u8,
        pdwSize: *mut u32,
        bOrder: i32,
        ulAf: u32,
        TableClass: u32,
        Reserved: u32,
    ) -> u32;

    fn SetPerTcpConnectionEStats(
        Row: *const MibTcpRow,
        EstatsType: i32,
        Rw: *const u8,
        RwVersion: u32,
        RwSize: u32,
        Offset: u32,
    ) -> u32;

    fn GetPerTcpConnectionEStats(
        Row: *const MibTcpRow,
        EstatsType: i32,
        Rw: *mut u8,
        RwVersion: u32,
        RwSize: u32,
        Ros: *mut u8,
        RosVersion: u32,
        RosSize: u32,
        Rod: *mut u8,
        RodVersion: u32,
        RodSize: u32,
    ) -> u32;

    fn SetPerTcp6ConnectionEStats(
        Row: *const MibTcp6Row,
        EstatsType: i32,
        Rw: *const u8,
        RwVersion: u32,
        RwSize: u32,
        Offset: u32,
    ) -> u32;

    fn GetPerTcp6ConnectionEStats(
        Row: *const MibTcp6Row,
        EstatsType: i32,
        Rw: *mut u8,
        RwVersion: u32,
        RwSize: u32,
        Ros: *mut u8,
        RosVersion: u32,
        RosSize: u32,
        Rod: *mut u8,
        RodVersion: u32,
        RodSize: u32,
    ) -> u32;
}

/// Enumerate the IPv4 TCP connection table, retrying once with a
/// correctly-sized buffer on `ERROR_INSUFFICIENT_BUFFER`.
pub fn enum_tcp_v4() -> std::io::Result<Vec<MibTcpRow>> {
    unsafe {
        let mut size: u32 = 0;
        let mut status =
            GetExtendedTcpTable(std::ptr::null_mut(), &mut size, 0, AF_INET, TCP_TABLE_OWNER_PID_ALL, 0);
        if status != crate::error::ERROR_INSUFFICIENT_BUFFER && status != crate::error::ERROR_SUCCESS {
            return Err(std::io::Error::from_raw_os_error(status as i32));
        }
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; size as usize];
        status = GetExtendedTcpTable(buf.as_mut_ptr(), &mut size, 0, AF_INET, TCP_TABLE_OWNER_PID_ALL, 0);
        if status == crate::error::ERROR_INSUFFICIENT_BUFFER {
            // retry once with the now-correctly-sized buffer
            buf = vec![0u8; size as usize];
            status = GetExtendedTcpTable(buf.as_mut_ptr(), &mut size, 0, AF_INET, TCP_TABLE_OWNER_PID_ALL, 0);
        }
        if status != crate::error::ERROR_SUCCESS {
            return Err(std::io::Error::from_raw_os_error(status as i32));
        }

        let table = &*(buf.as_ptr() as *const MibTcpTableOwnerPid);
        let rows = std::slice::from_raw_parts(table.table.as_ptr(), table.dwNumEntries as usize);
        Ok(rows
            .iter()
            .map(|r| MibTcpRow {
                dwState: r.dwState,
                dwLocalAddr: r.dwLocalAddr,
                dwLocalPort: r.dwLocalPort,
                dwRemoteAddr: r.dwRemoteAddr,
                dwRemotePort: r.dwRemotePort,
            })
            .collect())
    }
}

/// Enumerate the IPv6 TCP connection table, same retry protocol.
pub fn enum_tcp_v6() -> std::io::Result<Vec<MibTcp6Row>> {
    unsafe {
        let mut size: u32 = 0;
        let mut status =
            GetExtendedTcpTable(std::ptr::null_mut(), &mut size, 0, AF_INET6, TCP_TABLE_OWNER_PID_ALL, 0);
        if status != crate::error::ERROR_INSUFFICIENT_BUFFER && status != crate::error::ERROR_SUCCESS {
            return Err(std::io::Error::from_raw_os_error(status as i32));
        }
        if size == 0 {
            return Ok(Vec::new());
        }

        let mut buf = vec![0u8; size as usize];
        status = GetExtendedTcpTable(buf.as_mut_ptr(), &mut size, 0, AF_INET6, TCP_TABLE_OWNER_PID_ALL, 0);
        if status == crate::error::ERROR_INSUFFICIENT_BUFFER {
            buf = vec![0u8; size as usize];
            status = GetExtendedTcpTable(buf.as_mut_ptr(), &mut size, 0, AF_INET6, TCP_TABLE_OWNER_PID_ALL, 0);
        }
        if status != crate::error::ERROR_SUCCESS {
            return Err(std::io::Error::from_raw_os_error(status as i32));
        }

        let table = &*(buf.as_ptr() as *const MibTcp6TableOwnerPid);
        let rows = std::slice::from_raw_parts(table.table.as_ptr(), table.dwNumEntries as usize);
        Ok(rows
            .iter()
            .map(|r| MibTcp6Row {
                State: r.dwState,
                LocalAddr: r.ucLocalAddr,
                dwLocalScopeId: r.dwLocalScopeId,
                dwLocalPort: r.dwLocalPort,
                RemoteAddr: r.ucRemoteAddr,
                dwRemoteScopeId: r.dwRemoteScopeId,
                dwRemotePort: r.dwRemotePort,
            })
            .collect())
    }
}

pub fn set_estats_v4(row: &MibTcpRow, family: Family, rw: &[u8]) -> u32 {
    unsafe {
        SetPerTcpConnectionEStats(
            row as *const MibTcpRow,
            estats_type(family),
            rw.as_ptr(),
            0,
            rw.len() as u32,
            0,
        )
    }
}

pub fn set_estats_v6(row: &MibTcp6Row, family: Family, rw: &[u8]) -> u32 {
    unsafe {
        SetPerTcp6ConnectionEStats(
            row as *const MibTcp6Row,
            estats_type(family),
            rw.as_ptr(),
            0,
            rw.len() as u32,
            0,
        )
    }
}

fn buf_ptr_len(buf: &mut Option<&mut [u8]>) -> (*mut u8, u32) {
    match buf {
        Some(b) => (b.as_mut_ptr(), b.len() as u32),
        None => (std::ptr::null_mut(), 0),
    }
}

pub fn get_estats_v4(
    row: &MibTcpRow,
    family: Family,
    mut rw: Option<&mut [u8]>,
    mut ros: Option<&mut [u8]>,
    mut rod: Option<&mut [u8]>,
) -> u32 {
    let (rw_ptr, rw_len) = buf_ptr_len(&mut rw);
    let (ros_ptr, ros_len) = buf_ptr_len(&mut ros);
    let (rod_ptr, rod_len) = buf_ptr_len(&mut rod);
    unsafe {
        GetPerTcpConnectionEStats(
            row as *const MibTcpRow,
            estats_type(family),
            rw_ptr,
            0,
            rw_len,
            ros_ptr,
            0,
            ros_len,
            rod_ptr,
            0,
            rod_len,
        )
    }
}

pub fn get_estats_v6(
    row: &MibTcp6Row,
    family: Family,
    mut rw: Option<&mut [u8]>,
    mut ros: Option<&mut [u8]>,
    mut rod: Option<&mut [u8]>,
) -> u32 {
    let (rw_ptr, rw_len) = buf_ptr_len(&mut rw);
    let (ros_ptr, ros_len) = buf_ptr_len(&mut ros);
    let (rod_ptr, rod_len) = buf_ptr_len(&mut rod);
    unsafe {
        GetPerTcp6ConnectionEStats(
            row as *const MibTcp6Row,
            estats_type(family),
            rw_ptr,
            0,
            rw_len,
            ros_ptr,
            0,
            ros_len,
            rod_ptr,
            0,
            rod_len,
        )
    }
}
