//! The pfn→mfn translation table under construction, and the per-pfn type
//! tags that arrive alongside each page in the batch stream.

use crate::frame::{Mfn, Pfn, INVALID_P2M_ENTRY};
use crate::sys::{
    XEN_DOMCTL_PFINFO_L1TAB, XEN_DOMCTL_PFINFO_L2TAB, XEN_DOMCTL_PFINFO_L3TAB,
    XEN_DOMCTL_PFINFO_L4TAB, XEN_DOMCTL_PFINFO_LPINTAB, XEN_DOMCTL_PFINFO_LTABTYPE_MASK,
    XEN_DOMCTL_PFINFO_LTAB_SHIFT, XEN_DOMCTL_PFINFO_NOTAB, XEN_DOMCTL_PFINFO_XTAB,
};

/// The table-type dimension of a pfn's type tag.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TableKind {
    NoTab,
    L1,
    L2,
    L3,
    L4,
    /// Bogus/unmapped: no page payload for this pfn in the stream.
    XTab,
    /// Unrecognized LTABTYPE nibble (5/6/7): unlike `XTab`, the page payload
    /// for this pfn is still present in the stream and must be consumed.
    Invalid,
}

impl TableKind {
    pub fn level(self) -> Option<u32> {
        match self {
            TableKind::L1 => Some(1),
            TableKind::L2 => Some(2),
            TableKind::L3 => Some(3),
            TableKind::L4 => Some(4),
            TableKind::NoTab | TableKind::XTab | TableKind::Invalid => None,
        }
    }

    pub fn is_page_table(self) -> bool {
        self.level().is_some()
    }
}

/// A decoded `pfn_type[]` word: table-type nibble plus the pin flag.
#[derive(Copy, Clone, Debug)]
pub struct PfnType {
    raw: u32,
}

impl PfnType {
    pub fn decode(raw: u32) -> Self {
        PfnType { raw }
    }

    pub fn raw(self) -> u32 {
        self.raw
    }

    pub fn kind(self) -> TableKind {
        if self.raw == XEN_DOMCTL_PFINFO_XTAB {
            return TableKind::XTab;
        }
        match self.raw & XEN_DOMCTL_PFINFO_LTABTYPE_MASK {
            XEN_DOMCTL_PFINFO_NOTAB => TableKind::NoTab,
            XEN_DOMCTL_PFINFO_L1TAB => TableKind::L1,
            XEN_DOMCTL_PFINFO_L2TAB => TableKind::L2,
            XEN_DOMCTL_PFINFO_L3TAB => TableKind::L3,
            XEN_DOMCTL_PFINFO_L4TAB => TableKind::L4,
            _ => TableKind::Invalid,
        }
    }

    pub fn pinned(self) -> bool {
        self.raw & XEN_DOMCTL_PFINFO_LPINTAB != 0
    }

    /// Whether this tag's table level equals `pt_levels` (the CR3/top-level
    /// check): compares against the untagged level-shifted encoding, mirroring
    /// the source's `pfn_type[pfn] == (pt_levels << LTAB_SHIFT)` test.
    pub fn is_top_level(self, pt_levels: u32) -> bool {
        (self.raw & XEN_DOMCTL_PFINFO_LTABTYPE_MASK) == (pt_levels << XEN_DOMCTL_PFINFO_LTAB_SHIFT)
    }
}

impl Default for PfnType {
    fn default() -> Self {
        PfnType::decode(XEN_DOMCTL_PFINFO_NOTAB)
    }
}

/// Owns the p2m table and the parallel per-pfn type table for the duration
/// of one restore.
pub struct P2MTable {
    pub p2m: Vec<Mfn>,
    pub pfn_type: Vec<PfnType>,
}

impl P2MTable {
    /// `mfns` is the hypervisor-assigned frame list from `get_pfn_list`,
    /// indexed by pfn; its order is the mfn ordering Xen chose.
    pub fn new(mfns: Vec<u64>) -> Self {
        let max_pfn = mfns.len();
        P2MTable {
            p2m: mfns.into_iter().map(Mfn::new).collect(),
            pfn_type: vec![PfnType::default(); max_pfn],
        }
    }

    pub fn max_pfn(&self) -> u64 {
        self.p2m.len() as u64
    }

    pub fn in_range(&self, pfn: Pfn) -> bool {
        pfn.index() < self.p2m.len()
    }

    pub fn mfn(&self, pfn: Pfn) -> Mfn {
        self.p2m[pfn.index()]
    }

    pub fn set_mfn(&mut self, pfn: Pfn, mfn: Mfn) {
        self.p2m[pfn.index()] = mfn;
    }

    pub fn invalidate(&mut self, pfn: Pfn) {
        self.p2m[pfn.index()] = INVALID_P2M_ENTRY;
    }

    pub fn set_type(&mut self, pfn: Pfn, ty: PfnType) {
        self.pfn_type[pfn.index()] = ty;
    }

    pub fn kind(&self, pfn: Pfn) -> TableKind {
        self.pfn_type[pfn.index()].kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_pin_and_level() {
        let t = PfnType::decode(XEN_DOMCTL_PFINFO_L3TAB | XEN_DOMCTL_PFINFO_LPINTAB);
        assert_eq!(t.kind(), TableKind::L3);
        assert!(t.pinned());
        assert_eq!(t.kind().level(), Some(3));
    }

    #[test]
    fn xtab_is_sentinel() {
        let t = PfnType::decode(XEN_DOMCTL_PFINFO_XTAB);
        assert_eq!(t.kind(), TableKind::XTab);
        assert!(!t.kind().is_page_table());
    }

    #[test]
    fn malformed_ltabtype_is_not_xtab() {
        let t = PfnType::decode(0x5000_0000);
        assert_eq!(t.kind(), TableKind::Invalid);
        assert_ne!(t.kind(), TableKind::XTab);
        assert!(!t.kind().is_page_table());
    }

    #[test]
    fn top_level_matches_pt_levels() {
        let t = PfnType::decode(XEN_DOMCTL_PFINFO_L4TAB);
        assert!(t.is_top_level(4));
        assert!(!t.is_top_level(3));
    }
}
