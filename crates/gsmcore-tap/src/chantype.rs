//! GSMTAP channel subtype codes and their derivation from RSL channel
//! numbers.
//!
//! The subtype byte carries the logical channel in its low bits and
//! [`ACCH`] when the message was sent on the associated control channel.

pub const UNKNOWN: u8 = 0x00;
pub const BCCH: u8 = 0x01;
pub const CCCH: u8 = 0x02;
pub const RACH: u8 = 0x03;
pub const AGCH: u8 = 0x04;
pub const PCH: u8 = 0x05;
pub const SDCCH: u8 = 0x06;
pub const SDCCH4: u8 = 0x07;
pub const SDCCH8: u8 = 0x08;
pub const TCH_F: u8 = 0x09;
pub const TCH_H: u8 = 0x0a;

/// Associated control channel flag.
pub const ACCH: u8 = 0x80;

/// RSL channel type (C-bits of the channel number, shifted into place).
pub mod rsl {
    pub const BM_ACCHS: u8 = 0x08;
    pub const LM_ACCHS: u8 = 0x10;
    pub const SDCCH4_ACCH: u8 = 0x20;
    pub const SDCCH8_ACCH: u8 = 0x40;
    pub const BCCH: u8 = 0x80;
    pub const RACH: u8 = 0x88;
    pub const PCH_AGCH: u8 = 0x90;

    /// Link identifier bit selecting the SACCH.
    pub const LINK_ID_SACCH: u8 = 0x40;
}

/// Map an RSL channel type and link identifier to a GSMTAP subtype.
///
/// Unknown channel types map to [`UNKNOWN`]. PCH/AGCH cannot be told
/// apart here and is reported as [`PCH`].
pub fn from_rsl(rsl_chantype: u8, link_id: u8) -> u8 {
    let subtype = match rsl_chantype {
        rsl::BM_ACCHS => TCH_F,
        rsl::LM_ACCHS => TCH_H,
        rsl::SDCCH4_ACCH => SDCCH4,
        rsl::SDCCH8_ACCH => SDCCH8,
        rsl::BCCH => BCCH,
        rsl::RACH => RACH,
        rsl::PCH_AGCH => PCH,
        _ => UNKNOWN,
    };

    if link_id & rsl::LINK_ID_SACCH != 0 {
        subtype | ACCH
    } else {
        subtype
    }
}

/// Like [`from_rsl`], but takes a full RSL channel number whose sub-channel
/// and timeslot bits are stripped first.
pub fn from_chan_nr(chan_nr: u8, link_id: u8) -> u8 {
    let rsl_chantype = match chan_nr >> 3 {
        0x01 => rsl::BM_ACCHS,
        0x02..=0x03 => rsl::LM_ACCHS,
        0x04..=0x07 => rsl::SDCCH4_ACCH,
        0x08..=0x0f => rsl::SDCCH8_ACCH,
        0x10 => rsl::BCCH,
        0x11 => rsl::RACH,
        0x12 => rsl::PCH_AGCH,
        _ => 0,
    };
    from_rsl(rsl_chantype, link_id)
}

/// Sub-slot (sub-channel) encoded in an RSL channel number.
pub fn sub_slot_from_chan_nr(chan_nr: u8) -> u8 {
    let cbits = chan_nr >> 3;
    match cbits {
        0x02..=0x03 => cbits & 0x01,
        0x04..=0x07 => cbits & 0x03,
        0x08..=0x0f => cbits & 0x07,
        _ => 0,
    }
}

/// Timeslot encoded in an RSL channel number.
pub fn timeslot_from_chan_nr(chan_nr: u8) -> u8 {
    chan_nr & 0x07
}

/// Whether the subtype carries the associated control channel flag.
pub fn is_acch(subtype: u8) -> bool {
    subtype & ACCH != 0
}

/// Returns a human-readable name for a subtype, ignoring the ACCH flag.
pub fn chantype_name(subtype: u8) -> &'static str {
    match subtype & !ACCH {
        BCCH => "BCCH",
        CCCH => "CCCH",
        RACH => "RACH",
        AGCH => "AGCH",
        PCH => "PCH",
        SDCCH => "SDCCH",
        SDCCH4 => "SDCCH/4",
        SDCCH8 => "SDCCH/8",
        TCH_F => "TCH/F",
        TCH_H => "TCH/H",
        _ => "UNKNOWN",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rsl_lookup_table() {
        assert_eq!(from_rsl(rsl::BM_ACCHS, 0), TCH_F);
        assert_eq!(from_rsl(rsl::LM_ACCHS, 0), TCH_H);
        assert_eq!(from_rsl(rsl::SDCCH4_ACCH, 0), SDCCH4);
        assert_eq!(from_rsl(rsl::SDCCH8_ACCH, 0), SDCCH8);
        assert_eq!(from_rsl(rsl::BCCH, 0), BCCH);
        assert_eq!(from_rsl(rsl::RACH, 0), RACH);
        assert_eq!(from_rsl(rsl::PCH_AGCH, 0), PCH);
        assert_eq!(from_rsl(0x98, 0), UNKNOWN);
    }

    #[test]
    fn sacch_link_sets_acch_flag() {
        assert_eq!(from_rsl(rsl::SDCCH8_ACCH, 0x40), SDCCH8 | ACCH);
        assert_eq!(from_rsl(rsl::BM_ACCHS, 0x43), TCH_F | ACCH);
        assert_eq!(from_rsl(0x00, 0x40), ACCH);
        assert!(is_acch(from_rsl(rsl::BCCH, 0x40)));
        assert!(!is_acch(from_rsl(rsl::BCCH, 0x03)));
    }

    #[test]
    fn chan_nr_strips_subchannel_and_timeslot() {
        // SDCCH/8 sub-channel 5 on timeslot 1
        let chan_nr = 0x40 | (5 << 3) | 1;
        assert_eq!(from_chan_nr(chan_nr, 0), SDCCH8);
        assert_eq!(sub_slot_from_chan_nr(chan_nr), 5);
        assert_eq!(timeslot_from_chan_nr(chan_nr), 1);

        // TCH/H sub-channel 1 on timeslot 2, SACCH
        let chan_nr = 0x10 | (1 << 3) | 2;
        assert_eq!(from_chan_nr(chan_nr, 0x40), TCH_H | ACCH);
        assert_eq!(sub_slot_from_chan_nr(chan_nr), 1);

        // SDCCH/4 sub-channel 3 on timeslot 0
        assert_eq!(from_chan_nr(0x20 | (3 << 3), 0), SDCCH4);
        assert_eq!(sub_slot_from_chan_nr(0x20 | (3 << 3)), 3);

        assert_eq!(from_chan_nr(0x80, 0), BCCH);
        assert_eq!(from_chan_nr(0x88, 0), RACH);
        assert_eq!(from_chan_nr(0x90, 0), PCH);
        assert_eq!(from_chan_nr(0x08 | 7, 0), TCH_F);
    }

    #[test]
    fn names_ignore_acch_flag() {
        assert_eq!(chantype_name(SDCCH8 | ACCH), "SDCCH/8");
        assert_eq!(chantype_name(TCH_F), "TCH/F");
        assert_eq!(chantype_name(0x7f), "UNKNOWN");
    }
}
