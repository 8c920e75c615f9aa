//! Per-format effect code tables.

use core::fmt;

use mp_ir::ModuleKind;

use super::EffectKind;
use EffectKind::*;

/// One effect code: display character and behavior.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectEntry {
    pub code: char,
    pub kind: EffectKind,
}

const fn entry(code: char, kind: EffectKind) -> EffectEntry {
    EffectEntry { code, kind }
}

/// A code that has no entry in the active map.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct UnmappedEffect {
    pub code: u8,
}

impl fmt::Display for UnmappedEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unmapped effect code {:#04x}", self.code)
    }
}

impl core::error::Error for UnmappedEffect {}

/// Raw effect code to behavior, indexed by code.
#[derive(Debug, PartialEq, Eq)]
pub struct EffectMap {
    name: &'static str,
    entries: &'static [EffectEntry],
}

const MOD_ENTRIES: [EffectEntry; 0x24] = [
    entry('0', Arpeggio),
    entry('1', PortaUp),
    entry('2', PortaDown),
    entry('3', PortaToNote),
    entry('4', Vibrato),
    entry('5', PortaVolumeSlide),
    entry('6', VibratoVolumeSlide),
    entry('7', Tremolo),
    entry('8', SetPan),
    entry('9', SampleOffset),
    entry('a', VolumeSlide),
    entry('b', PositionJump),
    entry('c', SetVolume),
    entry('d', PatternBreak),
    entry('e', ProtrackerExtended),
    entry('f', SetSpeedTempo),
    entry('g', Empty),
    entry('h', Empty),
    entry('i', Empty),
    entry('j', Empty),
    entry('k', Empty),
    entry('l', Empty),
    entry('m', Empty),
    entry('n', Empty),
    entry('o', Empty),
    entry('p', Empty),
    entry('q', Empty),
    entry('r', Empty),
    entry('s', Empty),
    entry('t', Empty),
    entry('u', Empty),
    entry('v', Empty),
    entry('w', Empty),
    entry('x', Empty),
    entry('y', Empty),
    entry('z', Empty),
];

const S3M_ENTRIES: [EffectEntry; 0x17] = [
    entry('-', Empty),
    entry('A', S3mSetSpeed),
    entry('B', PositionJump),
    entry('C', PatternBreak),
    entry('D', S3mVolumeSlide),
    entry('E', S3mPortaDown),
    entry('F', S3mPortaUp),
    entry('G', PortaToNote),
    entry('H', Vibrato),
    entry('I', S3mTremor),
    entry('J', Arpeggio),
    entry('K', VibratoVolumeSlide),
    entry('L', PortaVolumeSlide),
    entry('M', Empty),
    entry('N', Empty),
    entry('O', SampleOffset),
    entry('P', Empty),
    entry('Q', S3mRetrigVolumeSlide),
    entry('R', Tremolo),
    entry('S', S3mExtended),
    entry('T', S3mSetTempo),
    entry('U', S3mFineVibrato),
    entry('V', SetGlobalVolume),
];

const XM_ENTRIES: [EffectEntry; 0x21] = [
    entry('0', Arpeggio),
    entry('1', PortaUp),
    entry('2', PortaDown),
    entry('3', PortaToNote),
    entry('4', Vibrato),
    entry('5', PortaVolumeSlide),
    entry('6', VibratoVolumeSlide),
    entry('7', Tremolo),
    entry('8', SetPan),
    entry('9', SampleOffset),
    entry('a', VolumeSlide),
    entry('b', PositionJump),
    entry('c', SetVolume),
    entry('d', PatternBreak),
    entry('e', ProtrackerExtended),
    entry('f', SetSpeedTempo),
    entry('G', SetGlobalVolume),
    entry('H', GlobalVolumeSlide),
    entry('I', Empty),
    entry('J', Empty),
    entry('K', Empty),
    entry('L', Empty),
    entry('M', Empty),
    entry('N', Empty),
    entry('O', Empty),
    entry('P', Empty),
    entry('R', S3mRetrigVolumeSlide),
    entry('S', Empty),
    entry('T', S3mTremor),
    entry('U', Empty),
    entry('V', Empty),
    entry('W', Empty),
    entry('X', Empty),
];

impl EffectMap {
    pub const MOD: EffectMap = EffectMap {
        name: "mod",
        entries: &MOD_ENTRIES,
    };
    pub const S3M: EffectMap = EffectMap {
        name: "s3m",
        entries: &S3M_ENTRIES,
    };
    pub const XM: EffectMap = EffectMap {
        name: "xm",
        entries: &XM_ENTRIES,
    };

    /// Map used by songs of the given format.
    pub fn for_kind(kind: ModuleKind) -> &'static EffectMap {
        match kind {
            ModuleKind::Mod => &Self::MOD,
            ModuleKind::S3m => &Self::S3M,
            ModuleKind::Xm => &Self::XM,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for a raw effect code.
    pub fn lookup(&self, code: u8) -> Result<EffectEntry, UnmappedEffect> {
        self.entries
            .get(usize::from(code))
            .copied()
            .ok_or(UnmappedEffect { code })
    }

    /// Display character for a code, `?` when unmapped.
    pub fn code(&self, code: u8) -> char {
        self.lookup(code).map_or('?', |e| e.code)
    }
}
