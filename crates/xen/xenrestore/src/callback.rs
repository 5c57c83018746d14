//! Guest-side PV callback registration surface (`do_callback_op` /
//! `compat_callback_op`). This is state the restored vCPU context exposes
//! to its own kernel after boot, not part of the restore data path proper,
//! but it shares the same vCPU-context representation so it lives here.

use crate::error::{Error, Result};

pub const CALLBACKTYPE_EVENT: u32 = 0;
pub const CALLBACKTYPE_FAILSAFE: u32 = 1;
pub const CALLBACKTYPE_SYSCALL: u32 = 2;
pub const CALLBACKTYPE_SYSCALL32: u32 = 3;
pub const CALLBACKTYPE_SYSENTER: u32 = 4;
pub const CALLBACKTYPE_NMI: u32 = 6;

pub const CALLBACKF_MASK_EVENTS: u32 = 1;

/// The subset of PV entry points a guest may register, mirrored from the
/// vCPU context fields `TailPatcher` installs.
#[derive(Copy, Clone, Debug, Default)]
pub struct CallbackState {
    pub event_eip: u64,
    pub failsafe_eip: u64,
    pub syscall_eip: u64,
    pub syscall32_eip: u64,
    pub sysenter_eip: u64,
    pub nmi_eip: u64,
    pub mask_events: u32,
}

/// Compat (32-bit) variant: entry points are a `(cs, eip)` pair rather than
/// a bare canonical address.
#[derive(Copy, Clone, Debug, Default)]
pub struct CompatCallbackState {
    pub event: (u16, u32),
    pub failsafe: (u16, u32),
    pub syscall32: (u16, u32),
    pub sysenter: (u16, u32),
}

fn is_canonical(addr: u64) -> bool {
    let top17 = addr >> 47;
    top17 == 0 || top17 == 0x1ffff
}

/// A selector with a null index (bits [2..16) all zero) names no GDT/LDT
/// entry regardless of its RPL bits; such a selector is defaulted to the
/// flat ring-1 kernel selector. Any selector with a real index is the
/// guest's own choice and its RPL is left untouched.
fn fixup_compat_selector(cs: u16) -> u16 {
    if cs & !0x3 == 0 {
        (crate::sys::FLAT_KERNEL_CS as u16 & !0x3) | 0x1
    } else {
        cs
    }
}

pub struct CallbackOps;

impl CallbackOps {
    pub fn register(state: &mut CallbackState, kind: u32, address: u64, flags: u32) -> Result<()> {
        let mask = flags & CALLBACKF_MASK_EVENTS != 0;
        match kind {
            CALLBACKTYPE_EVENT => {
                if !is_canonical(address) {
                    return Err(Error::Validation("event callback address not canonical"));
                }
                state.event_eip = address;
            }
            CALLBACKTYPE_FAILSAFE => {
                state.failsafe_eip = address;
                Self::set_mask(state, kind, mask);
            }
            CALLBACKTYPE_SYSCALL => {
                state.syscall_eip = address;
                Self::set_mask(state, kind, mask);
            }
            CALLBACKTYPE_SYSCALL32 => {
                state.syscall32_eip = address;
                Self::set_mask(state, kind, mask);
            }
            CALLBACKTYPE_SYSENTER => {
                state.sysenter_eip = address;
                Self::set_mask(state, kind, mask);
            }
            CALLBACKTYPE_NMI => {
                state.nmi_eip = address;
            }
            _ => return Err(Error::Validation("unknown callback type")),
        }
        Ok(())
    }

    pub fn unregister(state: &mut CallbackState, kind: u32) -> Result<()> {
        match kind {
            CALLBACKTYPE_NMI => {
                state.nmi_eip = 0;
                Ok(())
            }
            CALLBACKTYPE_EVENT
            | CALLBACKTYPE_FAILSAFE
            | CALLBACKTYPE_SYSCALL
            | CALLBACKTYPE_SYSCALL32
            | CALLBACKTYPE_SYSENTER => Err(Error::Validation(
                "unregister permitted only for the nmi callback",
            )),
            _ => Err(Error::Validation("unknown callback type")),
        }
    }

    pub fn register_compat(
        state: &mut CompatCallbackState,
        kind: u32,
        cs: u16,
        eip: u32,
    ) -> Result<()> {
        let cs = fixup_compat_selector(cs);
        match kind {
            CALLBACKTYPE_EVENT => state.event = (cs, eip),
            CALLBACKTYPE_FAILSAFE => state.failsafe = (cs, eip),
            CALLBACKTYPE_SYSCALL32 => state.syscall32 = (cs, eip),
            CALLBACKTYPE_SYSENTER => state.sysenter = (cs, eip),
            _ => return Err(Error::Validation("unknown compat callback type")),
        }
        Ok(())
    }

    fn set_mask(state: &mut CallbackState, _kind: u32, mask: bool) {
        if mask {
            state.mask_events |= CALLBACKF_MASK_EVENTS;
        } else {
            state.mask_events &= !CALLBACKF_MASK_EVENTS;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_event_callback() {
        let mut state = CallbackState::default();
        CallbackOps::register(&mut state, CALLBACKTYPE_EVENT, 0xffff_8000_0010_0000, 0).unwrap();
        assert_eq!(state.event_eip, 0xffff_8000_0010_0000);
    }

    #[test]
    fn rejects_non_canonical_event_address() {
        let mut state = CallbackState::default();
        assert!(CallbackOps::register(&mut state, CALLBACKTYPE_EVENT, 0x0000_8000_0010_0000, 0).is_err());
    }

    #[test]
    fn mask_events_flag_round_trips() {
        let mut state = CallbackState::default();
        CallbackOps::register(&mut state, CALLBACKTYPE_SYSCALL, 0x1000, CALLBACKF_MASK_EVENTS)
            .unwrap();
        assert_ne!(state.mask_events & CALLBACKF_MASK_EVENTS, 0);
    }

    #[test]
    fn unregister_rejects_non_nmi() {
        let mut state = CallbackState::default();
        assert!(CallbackOps::unregister(&mut state, CALLBACKTYPE_EVENT).is_err());
        assert!(CallbackOps::unregister(&mut state, CALLBACKTYPE_NMI).is_ok());
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut state = CallbackState::default();
        assert!(CallbackOps::register(&mut state, 99, 0, 0).is_err());
    }

    #[test]
    fn compat_selector_with_real_index_is_left_intact() {
        let mut state = CompatCallbackState::default();
        CallbackOps::register_compat(&mut state, CALLBACKTYPE_EVENT, 0xe033, 0x1000).unwrap();
        assert_eq!(state.event.0, 0xe033);
    }

    #[test]
    fn compat_selector_preserves_ring0_with_real_index() {
        let mut state = CompatCallbackState::default();
        CallbackOps::register_compat(&mut state, CALLBACKTYPE_EVENT, 0x60, 0xC010_0000).unwrap();
        assert_eq!(state.event.0, 0x60);
        assert_eq!(state.event.1, 0xC010_0000);
    }

    #[test]
    fn compat_null_selector_defaults_to_flat_ring1() {
        let mut state = CompatCallbackState::default();
        CallbackOps::register_compat(&mut state, CALLBACKTYPE_EVENT, 0x0001, 0x1000).unwrap();
        assert_eq!(state.event.0 & 0x3, 0x1);
        assert_ne!(state.event.0 & !0x3, 0);
    }
}
