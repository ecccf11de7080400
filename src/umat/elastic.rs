//! Built-in isotropic hypoelastic routine

use crate::error::{UmatError, UmatResult};
use crate::math::Mat6;
use crate::umat::{LegacyUmat, UmatArgs};

/// Hypoelastic law σ ← σ + C·Δε with props `[E, ν]`.
///
/// Works on the legacy argument block like any external routine, so it
/// exercises the same marshalling path.
#[derive(Debug, Clone, Copy, Default)]
pub struct IsotropicElasticUmat;

impl IsotropicElasticUmat {
    pub fn new() -> Self {
        Self
    }

    /// Lamé parameters (λ, μ)
    pub fn lame(youngs_modulus: f64, poisson_ratio: f64) -> (f64, f64) {
        let e = youngs_modulus;
        let nu = poisson_ratio;
        let lambda = e * nu / ((1.0 + nu) * (1.0 - 2.0 * nu));
        let mu = e / (2.0 * (1.0 + nu));
        (lambda, mu)
    }

    /// Elasticity matrix for engineering shear strains
    pub fn stiffness(youngs_modulus: f64, poisson_ratio: f64) -> Mat6 {
        let (lambda, mu) = Self::lame(youngs_modulus, poisson_ratio);
        let mut c = Mat6::zeros();
        for i in 0..3 {
            for j in 0..3 {
                c[(i, j)] = lambda;
            }
            c[(i, i)] = lambda + 2.0 * mu;
            c[(i + 3, i + 3)] = mu;
        }
        c
    }
}

impl LegacyUmat for IsotropicElasticUmat {
    fn name(&self) -> &str {
        "isotropic-elastic"
    }

    fn check_properties(&self, props: &[f64]) -> UmatResult<()> {
        match props {
            [e, nu, ..] if *e > 0.0 && *nu > -1.0 && *nu < 0.5 => Ok(()),
            [e, nu, ..] => Err(UmatError::InvalidInput(format!(
                "elastic constants out of range: E = {}, nu = {}",
                e, nu
            ))),
            _ => Err(UmatError::InvalidInput(format!(
                "isotropic elasticity needs [E, nu], got {} properties",
                props.len()
            ))),
        }
    }

    fn call(&self, args: &mut UmatArgs) -> UmatResult<()> {
        self.check_properties(&args.props)?;
        let c = Self::stiffness(args.props[0], args.props[1]);

        for i in 0..6 {
            let mut increment = 0.0;
            for j in 0..6 {
                increment += c[(i, j)] * args.dstran[j];
            }
            args.sse += 0.5 * (2.0 * args.stress[i] + increment) * args.dstran[i];
            args.stress[i] += increment;
        }
        args.ddsdde.copy_from_slice(c.as_slice());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_lame_constants() {
        let (lambda, mu) = IsotropicElasticUmat::lame(200e3, 0.25);
        assert_relative_eq!(lambda, 80e3, epsilon = 1e-9);
        assert_relative_eq!(mu, 80e3, epsilon = 1e-9);
    }

    #[test]
    fn test_uniaxial_strain_increment() {
        let umat = IsotropicElasticUmat::new();
        let mut args = UmatArgs::new(&[200e3, 0.25], &[]).unwrap();
        args.dstran = [1e-3, 0.0, 0.0, 0.0, 0.0, 0.0];

        umat.call(&mut args).unwrap();
        assert_relative_eq!(args.stress[0], 240.0, epsilon = 1e-9);
        assert_relative_eq!(args.stress[1], 80.0, epsilon = 1e-9);
        assert_relative_eq!(args.stress[3], 0.0);
        assert_relative_eq!(args.ddsdde[6 * 3 + 3], 80e3, epsilon = 1e-9);
        // Untouched advisory
        assert_eq!(args.pnewdt, 10.0);
    }

    #[test]
    fn test_engineering_shear() {
        let umat = IsotropicElasticUmat::new();
        let mut args = UmatArgs::new(&[200e3, 0.25], &[]).unwrap();
        args.dstran = [0.0, 0.0, 0.0, 2e-3, 0.0, 0.0];

        umat.call(&mut args).unwrap();
        assert_relative_eq!(args.stress[3], 160.0, epsilon = 1e-9);
    }

    #[test]
    fn test_property_validation() {
        let umat = IsotropicElasticUmat::new();
        assert!(umat.check_properties(&[200e3, 0.3]).is_ok());
        assert!(umat.check_properties(&[200e3]).is_err());
        assert!(umat.check_properties(&[-1.0, 0.3]).is_err());
        assert!(umat.check_properties(&[200e3, 0.5]).is_err());
    }
}
