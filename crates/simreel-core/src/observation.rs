//! Sensor observations returned by environments

use std::collections::BTreeMap;

use image::{ImageBuffer, Luma, RgbImage};

/// Rendered RGB frame (height x width x 3, `u8`)
pub type Frame = RgbImage;

/// Single-channel depth image with values normalised to `[0, 1]`
pub type DepthImage = ImageBuffer<Luma<f32>, Vec<f32>>;

/// One sensor reading
#[derive(Debug, Clone, PartialEq)]
pub enum SensorReading {
    /// Color camera image
    Color(RgbImage),
    /// Depth camera image
    Depth(DepthImage),
    /// Non-visual reading (pose, joint state, GPS, ...)
    Vector(Vec<f64>),
}

impl SensorReading {
    /// Shape of the reading (`[h, w, c]` for images, `[n]` for vectors)
    #[must_use]
    pub fn shape(&self) -> Vec<usize> {
        match self {
            Self::Color(img) => vec![img.height() as usize, img.width() as usize, 3],
            Self::Depth(img) => vec![img.height() as usize, img.width() as usize, 1],
            Self::Vector(data) => vec![data.len()],
        }
    }

    /// Whether this reading can be drawn as an image
    #[must_use]
    pub fn is_visual(&self) -> bool {
        !matches!(self, Self::Vector(_))
    }
}

/// Mapping from sensor name to reading, ordered by sensor name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observations {
    sensors: BTreeMap<String, SensorReading>,
}

impl Observations {
    /// Create an empty observation map
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a sensor reading
    pub fn insert(&mut self, name: impl Into<String>, reading: SensorReading) {
        self.sensors.insert(name.into(), reading);
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, reading: SensorReading) -> Self {
        self.insert(name, reading);
        self
    }

    /// Look up a reading by sensor name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&SensorReading> {
        self.sensors.get(name)
    }

    /// Iterate over `(name, reading)` pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SensorReading)> {
        self.sensors.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Color sensors in name order
    pub fn color_sensors(&self) -> impl Iterator<Item = (&str, &RgbImage)> {
        self.iter().filter_map(|(name, reading)| match reading {
            SensorReading::Color(img) => Some((name, img)),
            _ => None,
        })
    }

    /// Depth sensors in name order
    pub fn depth_sensors(&self) -> impl Iterator<Item = (&str, &DepthImage)> {
        self.iter().filter_map(|(name, reading)| match reading {
            SensorReading::Depth(img) => Some((name, img)),
            _ => None,
        })
    }

    /// Number of sensors
    #[must_use]
    pub fn len(&self) -> usize {
        self.sensors.len()
    }

    /// Whether there are no sensors
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sensors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sensor_filters_follow_name_order() {
        let obs = Observations::new()
            .with("rgb_b", SensorReading::Color(RgbImage::new(2, 2)))
            .with("depth", SensorReading::Depth(DepthImage::new(2, 2)))
            .with("rgb_a", SensorReading::Color(RgbImage::new(4, 2)))
            .with("gps", SensorReading::Vector(vec![0.0, 1.0]));

        let colors: Vec<&str> = obs.color_sensors().map(|(name, _)| name).collect();
        assert_eq!(colors, vec!["rgb_a", "rgb_b"]);
        assert_eq!(obs.depth_sensors().count(), 1);
        assert_eq!(obs.len(), 4);
        assert_eq!(obs.get("gps").unwrap().shape(), vec![2]);
        assert!(!obs.get("gps").unwrap().is_visual());
        assert_eq!(obs.get("rgb_a").unwrap().shape(), vec![2, 4, 3]);
    }
}
