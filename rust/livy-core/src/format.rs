//! Number formatting options, owned by the session context.

use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// Controls how scalar numbers print. The imaginary part always renders with
/// a `j` prefix: `3+j4`, `-j2`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NumberFormat {
    /// Fixed number of decimal places, or shortest round-trip form when unset.
    pub precision: Option<usize>,
}

impl NumberFormat {
    pub fn real(&self, x: f64) -> String {
        match self.precision {
            Some(p) => format!("{x:.p$}"),
            None => format!("{x}"),
        }
    }

    /// Render a complex scalar. Real-valued numbers print as plain reals;
    /// pure-imaginary numbers as `+j2` / `-j2`; the general case as `3+j4`
    /// or `3-j4`.
    pub fn complex(&self, c: Complex64) -> String {
        let (re, im) = (c.re, c.im);
        if im == 0.0 {
            self.real(re)
        } else if re == 0.0 && im > 0.0 {
            format!("+j{}", self.real(im))
        } else if re == 0.0 && im < 0.0 {
            format!("-j{}", self.real(-im))
        } else if im < 0.0 {
            format!("{}-j{}", self.real(re), self.real(-im))
        } else {
            format!("{}+j{}", self.real(re), self.real(im))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn real_numbers_print_bare() {
        let f = NumberFormat::default();
        assert_eq!(f.complex(Complex64::new(1.5, 0.0)), "1.5");
        assert_eq!(f.complex(Complex64::new(-3.0, 0.0)), "-3");
    }

    #[test]
    fn imaginary_numbers_use_j_prefix() {
        let f = NumberFormat::default();
        assert_eq!(f.complex(Complex64::new(0.0, 2.0)), "+j2");
        assert_eq!(f.complex(Complex64::new(0.0, -2.0)), "-j2");
        assert_eq!(f.complex(Complex64::new(3.0, 4.0)), "3+j4");
        assert_eq!(f.complex(Complex64::new(3.0, -4.0)), "3-j4");
    }

    #[test]
    fn precision_applies_to_both_parts() {
        let f = NumberFormat {
            precision: Some(2),
        };
        assert_eq!(f.complex(Complex64::new(1.0, 0.5)), "1.00+j0.50");
    }
}
