//! Legacy UMAT calling contract
//!
//! Third-party constitutive routines receive 37 positional pointer
//! arguments. Inside the crate they are carried by the named
//! [`UmatArgs`] block; positional pointers only exist in
//! [`ForeignUmat::call`].

pub mod adapter;
pub mod elastic;

use std::ffi::c_int;

use crate::error::{UmatError, UmatResult};

pub use adapter::{engineering_strain, reorder_tangent, reorder_vector, UmatAdapter};
pub use elastic::IsotropicElasticUmat;

/// Direct stress components
pub const NDI: c_int = 3;
/// Shear stress components
pub const NSHR: c_int = 3;
/// Stress vector length
pub const NTENS: c_int = 6;
/// Step factor meaning "no objection"
pub const NOMINAL_TIME_STEP_FACTOR: f64 = 10.0;

/// Raw entry point with the fixed legacy signature
pub type UmatFn = unsafe extern "C" fn(
    stress: *mut f64,
    statev: *mut f64,
    ddsdde: *mut f64,
    sse: *mut f64,
    spd: *mut f64,
    scd: *mut f64,
    rpl: *mut f64,
    ddsdt: *mut f64,
    drplde: *mut f64,
    drpldt: *mut f64,
    stran: *mut f64,
    dstran: *mut f64,
    time: *mut f64,
    dtime: *mut f64,
    temp: *mut f64,
    dtemp: *mut f64,
    predef: *mut f64,
    dpred: *mut f64,
    cmname: *mut f64,
    ndi: *mut c_int,
    nshr: *mut c_int,
    ntens: *mut c_int,
    nstatv: *mut c_int,
    props: *mut f64,
    nprops: *mut c_int,
    coords: *mut f64,
    drot: *mut f64,
    pnewdt: *mut f64,
    celent: *mut f64,
    dfgrd0: *mut f64,
    dfgrd1: *mut f64,
    noel: *mut c_int,
    npt: *mut c_int,
    layer: *mut c_int,
    kspt: *mut c_int,
    kstep: *mut c_int,
    kinc: *mut c_int,
);

/// Named argument block of one legacy call, fields in positional order.
///
/// Tensors use the external ordering (11, 22, 33, 12, 13, 23) and 3x3
/// matrices are column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct UmatArgs {
    pub stress: [f64; 6],
    pub statev: Vec<f64>,
    pub ddsdde: [f64; 36],
    pub sse: f64,
    pub spd: f64,
    pub scd: f64,
    pub rpl: f64,
    pub ddsdt: [f64; 6],
    pub drplde: [f64; 6],
    pub drpldt: f64,
    pub stran: [f64; 6],
    pub dstran: [f64; 6],
    /// `[t - dt, t]`
    pub time: [f64; 2],
    pub dtime: f64,
    pub temp: f64,
    pub dtemp: f64,
    pub predef: f64,
    pub dpred: f64,
    pub cmname: f64,
    pub ndi: c_int,
    pub nshr: c_int,
    pub ntens: c_int,
    pub nstatv: c_int,
    pub props: Vec<f64>,
    pub nprops: c_int,
    pub coords: [f64; 3],
    pub drot: [f64; 9],
    pub pnewdt: f64,
    pub celent: f64,
    pub dfgrd0: [f64; 9],
    pub dfgrd1: [f64; 9],
    pub noel: c_int,
    pub npt: c_int,
    pub layer: c_int,
    pub kspt: c_int,
    pub kstep: c_int,
    pub kinc: c_int,
}

impl UmatArgs {
    /// Zeroed block holding copies of the property and state vectors.
    ///
    /// `pnewdt` starts at [`NOMINAL_TIME_STEP_FACTOR`] and rotations and
    /// gradients at the identity.
    pub fn new(props: &[f64], statev: &[f64]) -> UmatResult<Self> {
        const IDENTITY: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        Ok(Self {
            stress: [0.0; 6],
            statev: statev.to_vec(),
            ddsdde: [0.0; 36],
            sse: 0.0,
            spd: 0.0,
            scd: 0.0,
            rpl: 0.0,
            ddsdt: [0.0; 6],
            drplde: [0.0; 6],
            drpldt: 0.0,
            stran: [0.0; 6],
            dstran: [0.0; 6],
            time: [0.0; 2],
            dtime: 0.0,
            temp: 0.0,
            dtemp: 0.0,
            predef: 0.0,
            dpred: 0.0,
            cmname: 0.0,
            ndi: NDI,
            nshr: NSHR,
            ntens: NTENS,
            nstatv: to_c_int(statev.len(), "state variable count")?,
            props: props.to_vec(),
            nprops: to_c_int(props.len(), "property count")?,
            coords: [0.0; 3],
            drot: IDENTITY,
            pnewdt: NOMINAL_TIME_STEP_FACTOR,
            celent: 0.0,
            dfgrd0: IDENTITY,
            dfgrd1: IDENTITY,
            noel: 0,
            npt: 0,
            layer: 0,
            kspt: 0,
            kstep: 0,
            kinc: 0,
        })
    }

    /// Declared counts agree with the vector lengths
    pub fn check_lengths(&self) -> UmatResult<()> {
        if usize::try_from(self.nstatv).ok() != Some(self.statev.len()) {
            return Err(UmatError::LayoutMismatch(format!(
                "nstatv = {} but {} state variables are present",
                self.nstatv,
                self.statev.len()
            )));
        }
        if usize::try_from(self.nprops).ok() != Some(self.props.len()) {
            return Err(UmatError::LayoutMismatch(format!(
                "nprops = {} but {} properties are present",
                self.nprops,
                self.props.len()
            )));
        }
        Ok(())
    }
}

/// Integer argument conversion
pub(crate) fn to_c_int(value: usize, what: &str) -> UmatResult<c_int> {
    c_int::try_from(value)
        .map_err(|_| UmatError::InvalidInput(format!("{} {} does not fit a C int", what, value)))
}

/// A routine honouring the legacy contract
pub trait LegacyUmat: Send + Sync {
    fn name(&self) -> &str;

    /// Run one update in place. A law reports rejection through `args.pnewdt`.
    fn call(&self, args: &mut UmatArgs) -> UmatResult<()>;

    /// Validate the property vector once, before any call
    fn check_properties(&self, _props: &[f64]) -> UmatResult<()> {
        Ok(())
    }
}

/// Externally linked routine called through [`UmatFn`]
#[derive(Clone)]
pub struct ForeignUmat {
    name: String,
    func: UmatFn,
}

impl std::fmt::Debug for ForeignUmat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForeignUmat")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl ForeignUmat {
    /// Wrap a raw entry point.
    ///
    /// # Safety
    /// `func` must have the [`UmatFn`] signature, write no further than the
    /// fixed lengths and `nstatv`/`nprops`, and be safe to call concurrently
    /// from several threads on disjoint arguments.
    pub unsafe fn new(name: impl Into<String>, func: UmatFn) -> Self {
        Self {
            name: name.into(),
            func,
        }
    }
}

impl LegacyUmat for ForeignUmat {
    fn name(&self) -> &str {
        &self.name
    }

    fn call(&self, args: &mut UmatArgs) -> UmatResult<()> {
        args.check_lengths()?;
        // SAFETY: every pointer refers to a live buffer of the length the
        // contract declares; the constructor's caller vouched for `func`.
        unsafe {
            (self.func)(
                args.stress.as_mut_ptr(),
                args.statev.as_mut_ptr(),
                args.ddsdde.as_mut_ptr(),
                &mut args.sse,
                &mut args.spd,
                &mut args.scd,
                &mut args.rpl,
                args.ddsdt.as_mut_ptr(),
                args.drplde.as_mut_ptr(),
                &mut args.drpldt,
                args.stran.as_mut_ptr(),
                args.dstran.as_mut_ptr(),
                args.time.as_mut_ptr(),
                &mut args.dtime,
                &mut args.temp,
                &mut args.dtemp,
                &mut args.predef,
                &mut args.dpred,
                &mut args.cmname,
                &mut args.ndi,
                &mut args.nshr,
                &mut args.ntens,
                &mut args.nstatv,
                args.props.as_mut_ptr(),
                &mut args.nprops,
                args.coords.as_mut_ptr(),
                args.drot.as_mut_ptr(),
                &mut args.pnewdt,
                &mut args.celent,
                args.dfgrd0.as_mut_ptr(),
                args.dfgrd1.as_mut_ptr(),
                &mut args.noel,
                &mut args.npt,
                &mut args.layer,
                &mut args.kspt,
                &mut args.kstep,
                &mut args.kinc,
            );
        }
        // The routine must not resize its own arrays
        args.check_lengths()
    }
}
