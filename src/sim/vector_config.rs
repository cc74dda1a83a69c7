//! The configuration register: `vl` and `vtype`.
//!
//! Register grouping is not modelled. LMUL is decoded and kept so that
//! `vtype` reads back what was written, but VLMAX is always `VLEN / SEW`.

use log::{debug, warn};

use crate::error::CoreError;
use crate::inst::ElementWidth;

/// Bits of a single vector register.
pub const VLEN: usize = 512;
/// Bytes of a single vector register.
pub const VLENB: usize = VLEN / 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lmul {
    Mf8,
    Mf4,
    Mf2,
    M1,
    M2,
    M4,
    M8,
}

impl Lmul {
    fn from_vlmul(vlmul: u64) -> Option<Lmul> {
        match vlmul {
            0 => Some(Lmul::M1),
            1 => Some(Lmul::M2),
            2 => Some(Lmul::M4),
            3 => Some(Lmul::M8),
            5 => Some(Lmul::Mf8),
            6 => Some(Lmul::Mf4),
            7 => Some(Lmul::Mf2),
            _ => None,
        }
    }

    fn vlmul(self) -> u64 {
        match self {
            Lmul::M1 => 0,
            Lmul::M2 => 1,
            Lmul::M4 => 2,
            Lmul::M8 => 3,
            Lmul::Mf8 => 5,
            Lmul::Mf4 => 6,
            Lmul::Mf2 => 7,
        }
    }
}

/// Decoded vtype.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vtype {
    pub sew: ElementWidth,
    pub lmul: Lmul,
    pub vta: bool,
    pub vma: bool,
    pub vill: bool,
}

const VILL_TYPE: Vtype = Vtype {
    sew: ElementWidth::E8,
    lmul: Lmul::M1,
    vta: false,
    vma: false,
    vill: true,
};

impl Vtype {
    pub fn new(sew: ElementWidth) -> Vtype {
        Vtype {
            sew,
            lmul: Lmul::M1,
            vta: false,
            vma: false,
            vill: false,
        }
    }

    /// Decode raw vtype bits. Reserved SEW or LMUL encodings and any
    /// non-zero bit above `vma` give `vill`.
    pub fn decode(raw: u64) -> Vtype {
        if raw >> 8 != 0 {
            return VILL_TYPE;
        }
        let sew = match ElementWidth::from_vsew(((raw >> 3) & 0x7) as u32) {
            Some(sew) => sew,
            None => return VILL_TYPE,
        };
        let lmul = match Lmul::from_vlmul(raw & 0x7) {
            Some(lmul) => lmul,
            None => return VILL_TYPE,
        };
        Vtype {
            sew,
            lmul,
            vta: (raw >> 6) & 1 != 0,
            vma: (raw >> 7) & 1 != 0,
            vill: false,
        }
    }

    pub fn encode(&self) -> u64 {
        if self.vill {
            return 1u64 << 63;
        }
        self.lmul.vlmul()
            | ((self.sew.vsew() as u64) << 3)
            | ((self.vta as u64) << 6)
            | ((self.vma as u64) << 7)
    }

    pub fn vlmax(&self) -> u64 {
        if self.vill {
            0
        } else {
            capacity(self.sew)
        }
    }
}

/// Lanes of the given width in one register.
pub fn capacity(width: ElementWidth) -> u64 {
    (VLEN as u64) / width.bits() as u64
}

/// Requested application vector length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Avl {
    Value(u64),
    /// rs1 = x0, rd != x0: as many lanes as fit.
    Max,
    /// rs1 = x0, rd = x0: keep the current vl.
    Keep,
}

/// Result of a configure operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureOutcome {
    pub vl: u64,
    pub overflow: Option<CoreError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VectorConfig {
    vl: u64,
    vtype: Vtype,
}

impl VectorConfig {
    /// Power-on state. `vl` is clamped to what `sew` allows.
    pub fn new(vl: u64, sew: ElementWidth) -> VectorConfig {
        let vtype = Vtype::new(sew);
        VectorConfig {
            vl: vl.min(vtype.vlmax()),
            vtype,
        }
    }

    pub fn vl(&self) -> u64 {
        self.vl
    }

    pub fn vtype(&self) -> Vtype {
        self.vtype
    }

    pub fn sew(&self) -> ElementWidth {
        self.vtype.sew
    }

    pub fn is_illegal(&self) -> bool {
        self.vtype.vill
    }

    /// Apply a configure instruction: `vl = min(avl, VLMAX)`.
    pub fn configure(&mut self, avl: Avl, vtype: Vtype) -> ConfigureOutcome {
        if vtype.vill {
            warn!("configure requested an illegal vtype, vl forced to 0");
            self.vtype = VILL_TYPE;
            self.vl = 0;
            return ConfigureOutcome { vl: 0, overflow: None };
        }

        let vlmax = vtype.vlmax();
        let requested = match avl {
            Avl::Value(v) => v,
            Avl::Max => vlmax,
            Avl::Keep => self.vl,
        };
        let outcome = self.clamp(requested, vlmax);
        self.vtype = vtype;
        self.vl = outcome.vl;
        debug!(
            "[CONFIG] vl={} sew={} lmul={:?} vta={} vma={} (requested {})",
            self.vl, vtype.sew, vtype.lmul, vtype.vta, vtype.vma, requested
        );
        outcome
    }

    /// Debug/test backdoor standing in for the `configured_length` input.
    /// Not reachable from any instruction. The value is clamped like a
    /// configure request and the current vtype is kept.
    pub fn force_vector_length(&mut self, requested: u64) -> ConfigureOutcome {
        let outcome = self.clamp(requested, self.vtype.vlmax());
        self.vl = outcome.vl;
        debug!("[CONFIG] vl forced to {} (requested {})", self.vl, requested);
        outcome
    }

    fn clamp(&self, requested: u64, vlmax: u64) -> ConfigureOutcome {
        if requested > vlmax {
            warn!("requested vl {requested} exceeds VLMAX {vlmax}, clamping");
            ConfigureOutcome {
                vl: vlmax,
                overflow: Some(CoreError::ConfigurationOverflow {
                    requested,
                    granted: vlmax,
                }),
            }
        } else {
            ConfigureOutcome {
                vl: requested,
                overflow: None,
            }
        }
    }
}
