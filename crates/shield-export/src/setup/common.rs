//! Value types shared across setup entities

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// Point or extent in setup coordinates (cm).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

impl From<Point> for Vector3<f64> {
    fn from(p: Point) -> Self {
        Vector3::new(p.x, p.y, p.z)
    }
}

impl From<Vector3<f64>> for Point {
    fn from(v: Vector3<f64>) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Display color, used by editors only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
}

/// Transverse beam profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Distribution {
    #[default]
    Gaussian,
    Flat,
}

/// Particle species, used for the beam projectile and for scoring filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParticleType {
    Neutron,
    #[default]
    Proton,
    PionMinus,
    PionPlus,
    PionZero,
    AntiNeutron,
    AntiProton,
    KaonMinus,
    KaonPlus,
    KaonZero,
    KaonAnti,
    Gamma,
    Electron,
    Positron,
    MuonMinus,
    MuonPlus,
    ENeutrino,
    EAntiNeutrino,
    MuNeutrino,
    MuAntiNeutrino,
    Deuteron,
    Triton,
    He3,
    He4,
    HeavyIon {
        #[serde(rename = "nucleonsCount")]
        nucleons_count: u32,
        charge: u32,
    },
}
