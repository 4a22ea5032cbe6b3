//! Metrics of the standard (base-14) font families, used when a page font does not carry its own widths.

/// Helvetica advance widths for the printable ASCII range `0x20..=0x7E`, in thousandths of an em.
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // 0x20
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // 0x30
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // 0x40
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 0x50
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // 0x60
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 0x70
];

/// Times-Roman advance widths for the printable ASCII range `0x20..=0x7E`, in thousandths of an em.
const TIMES_WIDTHS: [u16; 95] = [
    250, 333, 408, 500, 500, 833, 778, 180, 333, 333, 500, 564, 250, 333, 250, 278, // 0x20
    500, 500, 500, 500, 500, 500, 500, 500, 500, 500, 278, 278, 564, 564, 564, 444, // 0x30
    921, 722, 667, 667, 722, 611, 556, 722, 722, 333, 389, 722, 611, 889, 722, 722, // 0x40
    556, 722, 667, 556, 611, 722, 722, 944, 722, 722, 611, 333, 278, 333, 469, 500, // 0x50
    333, 444, 500, 444, 500, 444, 333, 500, 500, 278, 278, 500, 278, 778, 500, 500, // 0x60
    500, 500, 333, 389, 278, 500, 500, 722, 500, 500, 444, 480, 200, 480, 541, // 0x70
];

/// The families of the fourteen standard fonts every PDF reader provides.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum StandardFamily {
    Helvetica,
    Times,
    Courier,
    Symbol,
    ZapfDingbats,
}

impl StandardFamily {
    /// Guess the family from a `BaseFont` name. Common aliases of the standard fonts
    /// (`Arial` for Helvetica, `TimesNewRoman` for Times) are accepted as well.
    pub(crate) fn from_base_font(name: &str) -> Option<Self> {
        let name = name.rsplit('+').next().unwrap_or(name).to_lowercase();
        let family = name.split(['-', ',']).next().unwrap_or(&name);
        match family {
            "helvetica" | "helv" | "arial" | "arialmt" => Some(StandardFamily::Helvetica),
            "times" | "timo" | "times roman" | "timesnewroman" | "timesnewromanps"
            | "timesnewromanpsmt" => Some(StandardFamily::Times),
            "courier" | "cour" | "couriernew" | "couriernewpsmt" => Some(StandardFamily::Courier),
            "symbol" | "symb" => Some(StandardFamily::Symbol),
            "zapfdingbats" | "zadb" => Some(StandardFamily::ZapfDingbats),
            _ => None,
        }
    }

    /// The advance width of a character, in thousandths of an em.
    pub(crate) fn char_width(self, character: char) -> f32 {
        use unicode_normalization::UnicodeNormalization as _;

        let table = match self {
            StandardFamily::Helvetica => &HELVETICA_WIDTHS,
            StandardFamily::Times => &TIMES_WIDTHS,
            StandardFamily::Courier => return 600.0,
            StandardFamily::Symbol | StandardFamily::ZapfDingbats => return 600.0,
        };
        // Accented letters take the width of their base letter
        let base = std::iter::once(character).nfd().next().unwrap_or(character);
        match base as u32 {
            code @ 0x20..=0x7E => table[(code - 0x20) as usize] as f32,
            _ => self.default_width(),
        }
    }

    fn default_width(self) -> f32 {
        match self {
            StandardFamily::Helvetica => 556.0,
            StandardFamily::Times => 500.0,
            _ => 600.0,
        }
    }

    /// The ascent and descent of the family, in thousandths of an em.
    pub(crate) fn vertical_metrics(self) -> (f32, f32) {
        match self {
            StandardFamily::Helvetica => (718.0, -207.0),
            StandardFamily::Times => (683.0, -217.0),
            StandardFamily::Courier => (629.0, -157.0),
            StandardFamily::Symbol | StandardFamily::ZapfDingbats => (800.0, -200.0),
        }
    }
}
