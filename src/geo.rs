//! # Geocoordinate Encoding Module
//!
//! Converte coordinate decimali nelle due codifiche richieste dai metadata.
//!
//! ## Codifiche:
//! - **EXIF GPS**: gradi/minuti/secondi come razionali, con riferimento
//!   emisfero separato (`N`/`S`, `E`/`W`)
//! - **ISO 6709** (tag `location` del container video):
//!   `+DD.dddddd+DDD.dddddd/`
//!
//! ## Precisione:
//! Il valore assoluto viene arrotondato al centesimo di secondo più vicino
//! prima della scomposizione, così i secondi non raggiungono mai 60 e la
//! ricostruzione resta entro 1/360000 di grado dall'input.

/// Hundredths of an arc second per degree
const HUNDREDTHS_PER_DEGREE: f64 = 360_000.0;

/// A WGS84 position in signed decimal degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Unsigned degrees/minutes/seconds with centisecond precision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dms {
    pub degrees: u32,
    pub minutes: u32,
    /// Seconds scaled by 100
    pub centiseconds: u32,
}

impl Dms {
    /// Decompose the magnitude of `value`
    pub fn from_decimal(value: f64) -> Self {
        let total = (value.abs() * HUNDREDTHS_PER_DEGREE).round() as u64;
        let degrees = total / 360_000;
        let rest = total % 360_000;
        Self {
            degrees: degrees as u32,
            minutes: (rest / 6_000) as u32,
            centiseconds: (rest % 6_000) as u32,
        }
    }

    /// `(numerator, denominator)` triple for the EXIF GPS rational array
    pub fn to_rationals(self) -> [(u32, u32); 3] {
        [
            (self.degrees, 1),
            (self.minutes, 1),
            (self.centiseconds, 100),
        ]
    }

    /// Magnitude in decimal degrees
    pub fn to_decimal(self) -> f64 {
        self.degrees as f64 + self.minutes as f64 / 60.0 + self.centiseconds as f64 / HUNDREDTHS_PER_DEGREE
    }
}

impl std::fmt::Display for Dms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}°{:02}'{:02}.{:02}\"",
            self.degrees,
            self.minutes,
            self.centiseconds / 100,
            self.centiseconds % 100
        )
    }
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn latitude_ref(&self) -> &'static str {
        if self.latitude >= 0.0 { "N" } else { "S" }
    }

    pub fn longitude_ref(&self) -> &'static str {
        if self.longitude >= 0.0 { "E" } else { "W" }
    }

    pub fn latitude_dms(&self) -> Dms {
        Dms::from_decimal(self.latitude)
    }

    pub fn longitude_dms(&self) -> Dms {
        Dms::from_decimal(self.longitude)
    }

    /// ISO 6709 string as read by QuickTime/MP4 players
    pub fn to_iso6709(&self) -> String {
        format!(
            "{}{:09.6}{}{:010.6}/",
            if self.latitude >= 0.0 { '+' } else { '-' },
            self.latitude.abs(),
            if self.longitude >= 0.0 { '+' } else { '-' },
            self.longitude.abs()
        )
    }
}

impl std::fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}{}, {}{}",
            self.latitude_ref(),
            self.latitude_dms(),
            self.longitude_ref(),
            self.longitude_dms()
        )
    }
}
