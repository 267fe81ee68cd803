//! Regression test parameters and checks

use crate::error::TestError;
use qforest_core::Image;

/// Regression test mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RegTestMode {
    /// Record new expectations
    Generate,
    /// Check against expectations (default)
    #[default]
    Compare,
    /// Run and print, never fail
    Display,
}

impl RegTestMode {
    /// Read the mode from `REGTEST_MODE`.
    pub fn from_env() -> Self {
        match std::env::var("REGTEST_MODE")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "generate" => Self::Generate,
            "display" => Self::Display,
            _ => Self::Compare,
        }
    }
}

/// Regression test state
///
/// Each check bumps the index, so failure messages name the check that
/// went wrong; [`RegParams::cleanup`] reports the summary.
pub struct RegParams {
    /// Name of the test (e.g., "segmentation")
    pub test_name: String,
    index: usize,
    pub mode: RegTestMode,
    success: bool,
    failures: Vec<String>,
}

impl RegParams {
    /// Start a regression test named `test_name`.
    ///
    /// The mode comes from the `REGTEST_MODE` environment variable.
    pub fn new(test_name: &str) -> Self {
        let mode = RegTestMode::from_env();

        eprintln!();
        eprintln!("////////////////////////////////////////////////");
        eprintln!("////////////////   {}_reg   ///////////////", test_name);
        eprintln!("////////////////////////////////////////////////");
        eprintln!("Mode: {:?}", mode);

        Self {
            test_name: test_name.to_string(),
            index: 0,
            mode,
            success: true,
            failures: Vec::new(),
        }
    }

    /// Index of the last check
    pub fn index(&self) -> usize {
        self.index
    }

    /// Check if in display mode
    pub fn display(&self) -> bool {
        self.mode == RegTestMode::Display
    }

    fn fail(&mut self, error: TestError) {
        let msg = format!("Failure in {}_reg: {}", self.test_name, error);
        eprintln!("{}", msg);
        self.failures.push(msg);
        if !self.display() {
            self.success = false;
        }
    }

    /// Compare two floating-point values.
    ///
    /// Returns `true` if `|expected - actual| <= delta`.
    pub fn compare_values(&mut self, expected: f64, actual: f64, delta: f64) -> bool {
        self.index += 1;
        let diff = (expected - actual).abs();
        // NaN never matches
        if diff.is_nan() || diff > delta {
            self.fail(TestError::ValueMismatch {
                index: self.index,
                expected,
                actual,
                delta,
            });
            false
        } else {
            true
        }
    }

    /// Check a boolean condition.
    pub fn compare_bool(&mut self, expected: bool, actual: bool) -> bool {
        self.compare_values(f64::from(u8::from(expected)), f64::from(u8::from(actual)), 0.0)
    }

    /// Compare two images for identical size and samples.
    pub fn compare_images(&mut self, image1: &Image, image2: &Image) -> bool {
        self.index += 1;
        if image1.sizes_equal(image2) && image1.data() == image2.data() {
            return true;
        }
        if let Some(at) = image1
            .data()
            .iter()
            .zip(image2.data())
            .position(|(a, b)| a != b)
        {
            let w = image1.width() as usize;
            eprintln!("first sample mismatch at ({}, {})", at % w, at / w);
        }
        self.fail(TestError::ImageMismatch { index: self.index });
        false
    }

    /// Compare two byte strings.
    pub fn compare_strings(&mut self, data1: &[u8], data2: &[u8]) -> bool {
        self.index += 1;
        if data1 == data2 {
            return true;
        }
        let msg = format!(
            "Failure in {}_reg: string comparison for index {}\n\
             sizes: {} vs {}",
            self.test_name,
            self.index,
            data1.len(),
            data2.len()
        );
        eprintln!("{}", msg);
        self.failures.push(msg);
        if !self.display() {
            self.success = false;
        }
        false
    }

    /// Report results.
    ///
    /// Returns `true` if every check passed.
    pub fn cleanup(self) -> bool {
        if self.success {
            eprintln!("SUCCESS: {}_reg ({} checks)", self.test_name, self.index);
        } else {
            eprintln!("FAILURE: {}_reg", self.test_name);
            for failure in &self.failures {
                eprintln!("  {}", failure);
            }
        }
        eprintln!();

        self.success
    }

    /// Check if all checks have passed so far
    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn failures(&self) -> &[String] {
        &self.failures
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_from_env() {
        let mode = RegTestMode::from_env();
        assert!(matches!(
            mode,
            RegTestMode::Compare | RegTestMode::Generate | RegTestMode::Display
        ));
    }

    #[test]
    fn test_compare_values_within_delta() {
        let mut rp = RegParams::new("test");
        assert!(rp.compare_values(100.0, 100.5, 1.0));
        assert!(rp.is_success());
        assert_eq!(rp.index(), 1);
    }

    #[test]
    fn test_compare_values_failure() {
        let mut rp = RegParams::new("test");
        rp.mode = RegTestMode::Compare;
        assert!(!rp.compare_values(100.0, 200.0, 0.0));
        assert!(!rp.compare_values(0.0, f64::NAN, 1.0));
        assert!(!rp.is_success());
        assert_eq!(rp.failures().len(), 2);
    }

    #[test]
    fn test_compare_images() {
        let mut rp = RegParams::new("test");
        rp.mode = RegTestMode::Compare;
        let a = Image::from_vec(2, 1, vec![1, 2]).unwrap();
        let b = Image::from_vec(2, 1, vec![1, 3]).unwrap();
        assert!(rp.compare_images(&a, &a.clone()));
        assert!(!rp.compare_images(&a, &b));
        assert!(!rp.cleanup());
    }
}
