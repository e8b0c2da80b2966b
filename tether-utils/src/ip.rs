//
// SPDX-License-Identifier: MIT
//

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

// Address family identifier, used to classify upstream candidates and
// default-route resolution: choosing the interface that carries the best
// IPv4 default route.
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd, Hash)]
pub enum AddressFamily {
    Ipv4,
    Ipv6,
}

// Extension methods for IpAddr.
pub trait IpAddrExt {
    // Returns true if this is a usable (non-unspecified, non-loopback)
    // address.
    fn is_usable(&self) -> bool;

    // Returns the unspecified address of the given address family.
    fn unspecified(af: AddressFamily) -> IpAddr;

    // Returns the address family of this address.
    fn address_family(&self) -> AddressFamily;
}

impl IpAddrExt for IpAddr {
    fn is_usable(&self) -> bool {
        !self.is_unspecified() && !self.is_loopback()
    }

    fn unspecified(af: AddressFamily) -> IpAddr {
        match af {
            AddressFamily::Ipv4 => IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            AddressFamily::Ipv6 => IpAddr::V6(Ipv6Addr::UNSPECIFIED),
        }
    }

    fn address_family(&self) -> AddressFamily {
        match self {
            IpAddr::V4(_) => AddressFamily::Ipv4,
            IpAddr::V6(_) => AddressFamily::Ipv6,
        }
    }
}
