use clap::ValueEnum;
use regex::Regex;
use std::sync::LazyLock;

// Both programs print costs as doubles through a C++ stream, so large values
// come out as 1.23457e+06. The number must end the line; anything else is
// malformed output and parses as absent.
const COST: &str = r"([-+]?(?:\d+\.?\d*|\.\d+)(?:[eE][-+]?\d+)?)[ \t\r]*$";

// Multi-process scheduler prints progress lines with the same marker; the first one wins.
static MULT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)Current best solution cost:[ \t]*{}", COST)).expect("valid regex")
});

static SOLO_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?m)Best solution found with cost:[ \t]*{}", COST)).expect("valid regex")
});

/// Output contract of the external program being driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Marker {
    /// `Current best solution cost: <number>`
    Mult,
    /// `Best solution found with cost: <number>`
    Solo,
}

impl Marker {
    pub fn pattern(self) -> &'static Regex {
        match self {
            Marker::Mult => &MULT_RE,
            Marker::Solo => &SOLO_RE,
        }
    }

    /// Extract the cost from captured stdout. `None` if the marker is absent.
    pub fn parse(self, stdout: &str) -> Option<f64> {
        parse_marker(self, stdout)
    }
}

pub fn parse_marker(marker: Marker, text: &str) -> Option<f64> {
    marker
        .pattern()
        .captures(text)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mult_marker_between_noise() {
        let out = "noise\nCurrent best solution cost: 1483\nmore noise";
        assert_eq!(parse_marker(Marker::Mult, out), Some(1483.0));
    }

    #[test]
    fn mult_marker_takes_first_hit() {
        let out = "Current best solution cost: 2000\nCurrent best solution cost: 1500\n";
        assert_eq!(parse_marker(Marker::Mult, out), Some(2000.0));
    }

    #[test]
    fn mult_marker_accepts_stream_formatted_doubles() {
        assert_eq!(
            parse_marker(Marker::Mult, "Current best solution cost: 1.48346e+06\n"),
            Some(1_483_460.0)
        );
        assert_eq!(
            parse_marker(Marker::Mult, "Current best solution cost: 1483.5"),
            Some(1483.5)
        );
        assert_eq!(
            parse_marker(Marker::Mult, "Current best solution cost: 1483\r\n"),
            Some(1483.0)
        );
    }

    #[test]
    fn trailing_garbage_after_cost_is_absent() {
        assert_eq!(
            parse_marker(Marker::Mult, "Current best solution cost: 1483abc\n"),
            None
        );
        assert_eq!(
            parse_marker(Marker::Solo, "Best solution found with cost: 12.5 (partial)"),
            None
        );
    }

    #[test]
    fn solo_marker_accepts_decimal_and_exponent() {
        assert_eq!(
            parse_marker(Marker::Solo, "Best solution found with cost: 42.5\n"),
            Some(42.5)
        );
        assert_eq!(
            parse_marker(Marker::Solo, "Best solution found with cost: 1.23457e+06"),
            Some(1_234_570.0)
        );
        assert_eq!(
            parse_marker(Marker::Solo, "x\nBest solution found with cost: 917\ny"),
            Some(917.0)
        );
    }

    #[test]
    fn missing_marker_is_absent() {
        assert_eq!(parse_marker(Marker::Mult, "segfault\n"), None);
        assert_eq!(parse_marker(Marker::Solo, ""), None);
        // Markers are not interchangeable.
        assert_eq!(
            parse_marker(Marker::Solo, "Current best solution cost: 10"),
            None
        );
        assert_eq!(
            parse_marker(Marker::Mult, "Best solution found with cost: 10"),
            None
        );
    }

    #[test]
    fn malformed_value_is_absent() {
        assert_eq!(
            parse_marker(Marker::Mult, "Current best solution cost: n/a"),
            None
        );
        assert_eq!(
            parse_marker(Marker::Solo, "Best solution found with cost: nan?"),
            None
        );
    }

    #[test]
    fn parsing_is_a_pure_function_of_text() {
        let out = "a\nCurrent best solution cost: 77\nb";
        let first = Marker::Mult.parse(out);
        for _ in 0..3 {
            assert_eq!(Marker::Mult.parse(out), first);
        }
    }
}
