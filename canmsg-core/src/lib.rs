//! CAN message core data types
//!
//! This crate provides basic data type definitions used by other canmsg crates.
//! Users should not depend on this crate directly. Use the `canmsg::core` reexport instead.
#![no_std]

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct InvalidValue;

/// Number of data bytes a classic CAN frame can carry
pub const MAX_DATA_LENGTH: usize = 8;

/// CAN identifier format
///
/// The numeric encoding matches the raw codes used by the controller configuration:
/// 0 for the 11-bit base format, 1 for the 29-bit extended format.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum FrameKind {
    /// 11-bit identifier
    Standard = 0,
    /// 29-bit identifier
    Extended = 1,
}

impl FrameKind {
    pub const fn try_from_u8(code: u8) -> Option<FrameKind> {
        match code {
            0 => Some(FrameKind::Standard),
            1 => Some(FrameKind::Extended),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }

    /// Largest raw identifier representable in this format
    pub const fn max_id(self) -> u32 {
        match self {
            FrameKind::Standard => StandardId::MAX.as_raw() as u32,
            FrameKind::Extended => ExtendedId::MAX.as_raw(),
        }
    }
}

impl From<FrameKind> for u8 {
    fn from(value: FrameKind) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for FrameKind {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// Message direction as seen from the local node
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Direction {
    Receive = 0,
    Transmit = 1,
}

impl Direction {
    pub const fn try_from_u8(code: u8) -> Option<Direction> {
        match code {
            0 => Some(Direction::Receive),
            1 => Some(Direction::Transmit),
            _ => None,
        }
    }

    pub const fn into_u8(self) -> u8 {
        self as u8
    }
}

impl From<Direction> for u8 {
    fn from(value: Direction) -> Self {
        value.into_u8()
    }
}

impl TryFrom<u8> for Direction {
    type Error = InvalidValue;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::try_from_u8(value).ok_or(InvalidValue)
    }
}

/// 11-bit CAN identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct StandardId(u16);

impl StandardId {
    pub const MAX: Self = Self(0x7FF);

    pub const fn new(value: u16) -> Option<Self> {
        if value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn as_raw(&self) -> u16 {
        self.0
    }
}

impl From<StandardId> for u16 {
    fn from(value: StandardId) -> Self {
        value.as_raw()
    }
}

impl TryFrom<u16> for StandardId {
    type Error = InvalidValue;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// 29-bit CAN identifier
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ExtendedId(u32);

impl ExtendedId {
    pub const MAX: Self = Self(0x1FFF_FFFF);

    pub const fn new(value: u32) -> Option<Self> {
        if value <= Self::MAX.0 {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn as_raw(&self) -> u32 {
        self.0
    }
}

impl From<ExtendedId> for u32 {
    fn from(value: ExtendedId) -> Self {
        value.as_raw()
    }
}

impl TryFrom<u32> for ExtendedId {
    type Error = InvalidValue;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// CAN identifier of either format
///
/// Identifiers of different formats never compare equal, even if their raw values match.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Id {
    Standard(StandardId),
    Extended(ExtendedId),
}

impl Id {
    /// Creates an identifier of the given format. Returns `None` if `raw` does not fit.
    pub const fn new(raw: u32, kind: FrameKind) -> Option<Self> {
        match kind {
            FrameKind::Standard => {
                if raw <= StandardId::MAX.0 as u32 {
                    Some(Id::Standard(StandardId(raw as u16)))
                } else {
                    None
                }
            }
            FrameKind::Extended => match ExtendedId::new(raw) {
                Some(id) => Some(Id::Extended(id)),
                None => None,
            },
        }
    }

    pub const fn kind(&self) -> FrameKind {
        match self {
            Id::Standard(_) => FrameKind::Standard,
            Id::Extended(_) => FrameKind::Extended,
        }
    }

    pub const fn as_raw(&self) -> u32 {
        match self {
            Id::Standard(id) => id.0 as u32,
            Id::Extended(id) => id.0,
        }
    }
}

impl From<StandardId> for Id {
    fn from(value: StandardId) -> Self {
        Id::Standard(value)
    }
}

impl From<ExtendedId> for Id {
    fn from(value: ExtendedId) -> Self {
        Id::Extended(value)
    }
}

/// Classic CAN data length (0 to 8 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DataLength(u8);

impl DataLength {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(MAX_DATA_LENGTH as u8);

    pub const fn new(value: usize) -> Option<Self> {
        if value <= MAX_DATA_LENGTH {
            Some(Self(value as u8))
        } else {
            None
        }
    }

    pub const fn as_usize(&self) -> usize {
        self.0 as usize
    }

    pub const fn as_u8(&self) -> u8 {
        self.0
    }
}

impl From<DataLength> for usize {
    fn from(value: DataLength) -> Self {
        value.as_usize()
    }
}

impl TryFrom<usize> for DataLength {
    type Error = InvalidValue;

    fn try_from(value: usize) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidValue)
    }
}

/// A set of data slot indices (0..8)
///
/// Bit `n` represents slot `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SlotSet(u8);

impl SlotSet {
    pub const NONE: Self = Self(0);

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    const fn complement(self) -> Self {
        Self(!self.0)
    }

    /// Set containing only `slot`. Slots beyond the data length yield an empty set.
    pub const fn new_eq(slot: usize) -> Self {
        if slot < MAX_DATA_LENGTH {
            Self(1u8 << slot)
        } else {
            Self::NONE
        }
    }

    /// Set of all slots below `length`, i.e. the slots a frame of that length occupies
    pub const fn new_lt(length: DataLength) -> Self {
        match length.0 {
            0 => Self::NONE,
            n => Self(u8::MAX >> (MAX_DATA_LENGTH as u8 - n)),
        }
    }

    pub const fn contains(&self, slot: usize) -> bool {
        slot < MAX_DATA_LENGTH && (self.0 >> slot) & 0x1 != 0
    }

    pub const fn is_superset(&self, other: SlotSet) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn insert(&mut self, slot: usize) {
        self.0 |= Self::new_eq(slot).0
    }

    pub const fn remove(&mut self, slot: usize) {
        self.0 &= Self::new_eq(slot).complement().0
    }

    pub const fn first(&self) -> Option<usize> {
        match self.0.trailing_zeros() {
            8 => None,
            n => Some(n as usize),
        }
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == Self::NONE.0
    }
}

impl Default for SlotSet {
    fn default() -> Self {
        SlotSet::NONE
    }
}

impl core::ops::BitAnd<SlotSet> for SlotSet {
    type Output = Self;
    fn bitand(self, rhs: SlotSet) -> Self::Output {
        SlotSet(self.0 & rhs.0)
    }
}

impl core::ops::BitOr<SlotSet> for SlotSet {
    type Output = Self;
    fn bitor(self, rhs: SlotSet) -> Self::Output {
        SlotSet(self.0 | rhs.0)
    }
}

impl core::ops::BitOrAssign<SlotSet> for SlotSet {
    fn bitor_assign(&mut self, rhs: SlotSet) {
        self.0 |= rhs.0;
    }
}

impl core::iter::IntoIterator for SlotSet {
    type Item = usize;
    type IntoIter = SlotSetIterator;
    fn into_iter(self) -> Self::IntoIter {
        SlotSetIterator { residual: self }
    }
}

pub struct SlotSetIterator {
    residual: SlotSet,
}

impl core::iter::Iterator for SlotSetIterator {
    type Item = usize;
    fn next(&mut self) -> Option<Self::Item> {
        let first = self.residual.first();
        if let Some(slot) = first {
            self.residual.remove(slot);
        }
        first
    }
}

#[cfg(test)]
mod tests {
    extern crate std;
    use super::*;
    use std::vec::Vec;

    #[test]
    fn test_frame_kind_codes() {
        assert_eq!(FrameKind::try_from(0), Ok(FrameKind::Standard));
        assert_eq!(FrameKind::try_from(1), Ok(FrameKind::Extended));
        assert_eq!(FrameKind::try_from(2), Err(InvalidValue));
        assert_eq!(u8::from(FrameKind::Extended), 1);
    }

    #[test]
    fn test_direction_codes() {
        assert_eq!(Direction::try_from(0), Ok(Direction::Receive));
        assert_eq!(Direction::try_from(1), Ok(Direction::Transmit));
        assert_eq!(Direction::try_from(0xFF), Err(InvalidValue));
    }

    #[test]
    fn test_id_width() {
        assert_eq!(
            Id::new(0x7FF, FrameKind::Standard),
            Some(Id::Standard(StandardId::MAX))
        );
        assert_eq!(Id::new(0x800, FrameKind::Standard), None);
        assert_eq!(
            Id::new(0x800, FrameKind::Extended).map(|id| id.as_raw()),
            Some(0x800)
        );
        assert_eq!(
            Id::new(0x1FFF_FFFF, FrameKind::Extended),
            Some(Id::Extended(ExtendedId::MAX))
        );
        assert_eq!(Id::new(0x2000_0000, FrameKind::Extended), None);
    }

    #[test]
    fn test_id_kind_distinguishes_equal_raw_values() {
        let standard = Id::new(0x10, FrameKind::Standard).unwrap();
        let extended = Id::new(0x10, FrameKind::Extended).unwrap();
        assert_ne!(standard, extended);
        assert_eq!(standard.kind(), FrameKind::Standard);
        assert_eq!(extended.kind(), FrameKind::Extended);
    }

    #[test]
    fn test_data_length() {
        for len in 0..=8 {
            assert_eq!(DataLength::new(len).map(|l| l.as_usize()), Some(len));
        }
        assert_eq!(DataLength::new(9), None);
    }

    #[test]
    fn test_slot_set_lt() {
        for len in 0..=8 {
            let set = SlotSet::new_lt(DataLength::new(len).unwrap());
            let slots: Vec<usize> = set.into_iter().collect();
            assert_eq!(slots, (0..len).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_slot_set_insert_remove() {
        let mut set = SlotSet::NONE;
        set.insert(3);
        set.insert(7);
        set.insert(8);
        assert!(set.contains(3));
        assert!(set.contains(7));
        assert!(!set.contains(8));
        assert_eq!(set.len(), 2);

        set.remove(3);
        assert_eq!(set.first(), Some(7));
        set.remove(7);
        assert!(set.is_empty());
        assert_eq!(set.first(), None);
    }

    #[test]
    fn test_slot_set_superset() {
        let required = SlotSet::new_lt(DataLength::new(3).unwrap());
        let mut filled = SlotSet::NONE;
        assert!(filled.is_superset(SlotSet::NONE));
        filled.insert(0);
        filled.insert(2);
        assert!(!filled.is_superset(required));
        filled.insert(1);
        assert!(filled.is_superset(required));
    }
}
