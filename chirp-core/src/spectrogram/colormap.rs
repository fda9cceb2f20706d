//! Colormap lookup for spectrogram intensity values
//!
//! Named palettes are piecewise-linear interpolations over anchor colors
//! sampled from the matplotlib palettes the review UI offers. Greyscale
//! variants map intensity directly (or inverted, white = quiet).

/// Recognized palette for mapping [0,1] intensity to color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Colormap {
    Greys,
    GreysR,
    Viridis,
    Plasma,
    Inferno,
    Magma,
}

const VIRIDIS: &[[f32; 3]] = &[
    [0.267, 0.005, 0.329],
    [0.283, 0.141, 0.458],
    [0.254, 0.265, 0.530],
    [0.207, 0.372, 0.553],
    [0.164, 0.471, 0.558],
    [0.128, 0.567, 0.551],
    [0.135, 0.659, 0.518],
    [0.267, 0.749, 0.441],
    [0.478, 0.821, 0.318],
    [0.741, 0.873, 0.150],
    [0.993, 0.906, 0.144],
];

const PLASMA: &[[f32; 3]] = &[
    [0.050, 0.030, 0.528],
    [0.294, 0.012, 0.631],
    [0.492, 0.012, 0.658],
    [0.659, 0.134, 0.588],
    [0.798, 0.280, 0.470],
    [0.902, 0.425, 0.360],
    [0.973, 0.585, 0.252],
    [0.993, 0.766, 0.157],
    [0.940, 0.975, 0.131],
];

const INFERNO: &[[f32; 3]] = &[
    [0.001, 0.000, 0.014],
    [0.147, 0.045, 0.330],
    [0.356, 0.078, 0.423],
    [0.566, 0.160, 0.393],
    [0.762, 0.262, 0.295],
    [0.904, 0.411, 0.174],
    [0.979, 0.603, 0.064],
    [0.978, 0.816, 0.239],
    [0.988, 0.998, 0.645],
];

const MAGMA: &[[f32; 3]] = &[
    [0.001, 0.000, 0.014],
    [0.113, 0.065, 0.277],
    [0.317, 0.071, 0.485],
    [0.513, 0.148, 0.508],
    [0.716, 0.215, 0.475],
    [0.904, 0.320, 0.388],
    [0.988, 0.536, 0.382],
    [0.997, 0.770, 0.511],
    [0.987, 0.991, 0.750],
];

impl Colormap {
    /// Parse a palette name, case-insensitive. Returns None for unknown
    /// names; the renderer treats that as a fallback to inverted greyscale.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "greys" | "grays" => Some(Colormap::Greys),
            "greys_r" | "grays_r" => Some(Colormap::GreysR),
            "viridis" => Some(Colormap::Viridis),
            "plasma" => Some(Colormap::Plasma),
            "inferno" => Some(Colormap::Inferno),
            "magma" => Some(Colormap::Magma),
            _ => None,
        }
    }

    /// Map intensity t in [0,1] to RGB in [0,1]
    pub fn map(&self, t: f32) -> [f32; 3] {
        let t = t.clamp(0.0, 1.0);
        match self {
            Colormap::Greys => [t, t, t],
            Colormap::GreysR => [1.0 - t, 1.0 - t, 1.0 - t],
            Colormap::Viridis => lerp_table(VIRIDIS, t),
            Colormap::Plasma => lerp_table(PLASMA, t),
            Colormap::Inferno => lerp_table(INFERNO, t),
            Colormap::Magma => lerp_table(MAGMA, t),
        }
    }
}

fn lerp_table(table: &[[f32; 3]], t: f32) -> [f32; 3] {
    let span = (table.len() - 1) as f32;
    let pos = t * span;
    let lo = (pos.floor() as usize).min(table.len() - 1);
    let hi = (lo + 1).min(table.len() - 1);
    let frac = pos - lo as f32;
    let a = table[lo];
    let b = table[hi];
    [
        a[0] + (b[0] - a[0]) * frac,
        a[1] + (b[1] - a[1]) * frac,
        a[2] + (b[2] - a[2]) * frac,
    ]
}
