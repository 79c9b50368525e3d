//! Seawater properties needed to derive missing predictors.
//!
//! The estimator only talks to the [`SeawaterProperties`] trait. [`Eos80`]
//! implements it with the UNESCO EOS-80 family of formulas:
//!
//! - pressure from depth: Saunders (1981)
//! - adiabatic lapse rate and potential temperature: Bryden (1973),
//!   Fofonoff (1977) Runge-Kutta integration
//! - density: UNESCO (1981) one-atmosphere density and secant bulk modulus
//! - oxygen solubility: Garcia & Gordon (1992), Benson & Krause fit
//!
//! # Units
//!
//! - Temperature: °C (ITS-90)
//! - Salinity: PSS-78
//! - Pressure: dbar
//! - Density: kg/m³
//! - Oxygen: µmol/kg

/// Pure functions of the seawater state used by the derived-quantity step.
///
/// Implementations must be side-effect free; they are called once per row.
pub trait SeawaterProperties: Send + Sync {
    /// Sea pressure (dbar) at `depth` metres and latitude `lat` degrees.
    fn pressure(&self, depth: f64, lat: f64) -> f64;

    /// Potential temperature referenced to `p_ref` of a parcel at in-situ
    /// temperature `t` and pressure `p`.
    fn potential_temperature(&self, s: f64, t: f64, p: f64, p_ref: f64) -> f64;

    /// In-situ temperature at pressure `p` of a parcel with potential
    /// temperature `theta` referenced to `p_ref`.
    fn in_situ_temperature(&self, s: f64, theta: f64, p: f64, p_ref: f64) -> f64 {
        self.potential_temperature(s, theta, p_ref, p)
    }

    /// In-situ density (kg/m³).
    fn density(&self, s: f64, t: f64, p: f64) -> f64;

    /// Oxygen solubility at one atmosphere (µmol/kg) from salinity and
    /// potential temperature.
    fn oxygen_saturation(&self, s: f64, theta: f64) -> f64;
}

/// UNESCO EOS-80 seawater properties.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Eos80;

/// ITS-90 to IPTS-68 temperature factor used by the EOS-80 polynomials.
const T68_FACTOR: f64 = 1.00024;

impl Eos80 {
    pub fn new() -> Self {
        Self
    }

    /// Adiabatic lapse rate (°C/dbar), temperature on the IPTS-68 scale.
    fn adiabatic_lapse_rate(s: f64, t68: f64, p: f64) -> f64 {
        let ds = s - 35.0;
        let t = t68;

        let a = 3.5803e-5 + (8.5258e-6 + (-6.836e-8 + 6.6228e-10 * t) * t) * t;
        let b = (1.8932e-6 - 4.2393e-8 * t) * ds;
        let c = (1.8741e-8 + (-6.7795e-10 + (8.733e-12 - 5.4481e-14 * t) * t) * t)
            + (-1.1351e-10 + 2.7759e-12 * t) * ds;
        let e = -4.6206e-13 + (1.8676e-14 - 2.1687e-16 * t) * t;

        a + b + c * p + e * p * p
    }

    /// Density of standard mean ocean water at one atmosphere.
    fn smow(t68: f64) -> f64 {
        let t = t68;
        999.842594
            + (6.793952e-2 + (-9.095290e-3 + (1.001685e-4 + (-1.120083e-6 + 6.536332e-9 * t) * t) * t) * t)
                * t
    }

    /// Density at one atmosphere (kg/m³).
    pub fn density_surface(&self, s: f64, t: f64) -> f64 {
        let t68 = t * T68_FACTOR;
        let b = 8.24493e-1 + (-4.0899e-3 + (7.6438e-5 + (-8.2467e-7 + 5.3875e-9 * t68) * t68) * t68) * t68;
        let c = -5.72466e-3 + (1.0227e-4 - 1.6546e-6 * t68) * t68;
        let d = 4.8314e-4;

        Self::smow(t68) + b * s + c * s * s.sqrt() + d * s * s
    }

    /// Secant bulk modulus K(S, T, p), pressure in dbar.
    fn secant_bulk_modulus(s: f64, t: f64, p: f64) -> f64 {
        let p = p / 10.0; // bar
        let t = t * T68_FACTOR;
        let sr = s.sqrt();

        let aw = 3.239908 + (1.43713e-3 + (1.16092e-4 - 5.77905e-7 * t) * t) * t;
        let bw = 8.50935e-5 + (-6.12293e-6 + 5.2787e-8 * t) * t;
        let kw = 19652.21 + (148.4206 + (-2.327105 + (1.360477e-2 - 5.155288e-5 * t) * t) * t) * t;

        let a = aw + (2.2838e-3 + (-1.0981e-5 - 1.6078e-6 * t) * t + 1.91075e-4 * sr) * s;
        let b = bw + (-9.9348e-7 + (2.0816e-8 + 9.1697e-10 * t) * t) * s;
        let k0 = kw
            + (54.6746 + (-0.603459 + (1.09987e-2 - 6.1670e-5 * t) * t) * t
                + (7.944e-2 + (1.6483e-2 - 5.3009e-4 * t) * t) * sr)
                * s;

        k0 + (a + b * p) * p
    }
}

impl SeawaterProperties for Eos80 {
    fn pressure(&self, depth: f64, lat: f64) -> f64 {
        let x = lat.abs().to_radians().sin();
        let c1 = 5.92e-3 + x * x * 5.25e-3;
        ((1.0 - c1) - ((1.0 - c1).powi(2) - 8.84e-6 * depth).sqrt()) / 4.42e-6
    }

    fn potential_temperature(&self, s: f64, t: f64, p: f64, p_ref: f64) -> f64 {
        let sqrt2 = std::f64::consts::SQRT_2;
        let t68 = t * T68_FACTOR;
        let dp = p_ref - p;

        let mut dth = dp * Self::adiabatic_lapse_rate(s, t68, p);
        let mut th = t68 + 0.5 * dth;
        let mut q = dth;

        dth = dp * Self::adiabatic_lapse_rate(s, th, p + 0.5 * dp);
        th += (1.0 - 1.0 / sqrt2) * (dth - q);
        q = (2.0 - sqrt2) * dth + (-2.0 + 3.0 / sqrt2) * q;

        dth = dp * Self::adiabatic_lapse_rate(s, th, p + 0.5 * dp);
        th += (1.0 + 1.0 / sqrt2) * (dth - q);
        q = (2.0 + sqrt2) * dth + (-2.0 - 3.0 / sqrt2) * q;

        dth = dp * Self::adiabatic_lapse_rate(s, th, p + dp);
        th += (dth - 2.0 * q) / 6.0;

        th / T68_FACTOR
    }

    fn density(&self, s: f64, t: f64, p: f64) -> f64 {
        let k = Self::secant_bulk_modulus(s, t, p);
        self.density_surface(s, t) / (1.0 - (p / 10.0) / k)
    }

    fn oxygen_saturation(&self, s: f64, theta: f64) -> f64 {
        const A: [f64; 6] = [5.80871, 3.20291, 4.17887, 5.10006, -9.86643e-2, 3.80369];
        const B: [f64; 4] = [-7.01577e-3, -7.70028e-3, -1.13864e-2, -9.51519e-3];
        const C0: f64 = -2.75915e-7;

        let ts = ((298.15 - theta) / (273.15 + theta)).ln();
        let poly_a = A.iter().rev().fold(0.0, |acc, &a| acc * ts + a);
        let poly_b = B.iter().rev().fold(0.0, |acc, &b| acc * ts + b);

        (poly_a + s * poly_b + C0 * s * s).exp()
    }
}
