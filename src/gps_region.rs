use crate::location::{bounding_box_from_circle, GeoJsonPoint, GpsSides};

/// A region that can answer "is this point nearby".
///
/// Implementors only describe their bounding box; containment is a plain
/// lat/lon range test against it. Boxes crossing the antimeridian are not handled.
pub trait GpsRegion {
    fn boundaries(&self) -> GpsSides;

    fn contains(&self, point: &GeoJsonPoint) -> bool {
        let [lon, lat] = point.coordinates();
        let sides = self.boundaries();

        if lat - sides.top > 0.0 {
            return false;
        }
        if lat - sides.bottom < 0.0 {
            return false;
        }
        if lon - sides.right > 0.0 {
            return false;
        }
        if lon - sides.left < 0.0 {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectangularGpsRegion {
    pub sides: GpsSides,
}

impl RectangularGpsRegion {
    pub fn new(sides: GpsSides) -> Self {
        Self { sides }
    }
}

impl GpsRegion for RectangularGpsRegion {
    fn boundaries(&self) -> GpsSides {
        self.sides
    }
}

/// Square region centered on `center` with half side `radius_meters`.
///
/// `contains` is a square-in test, so points in the corners of the square
/// (up to `radius * sqrt(2)` away) are reported as inside.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircularGpsRegion {
    pub center: GeoJsonPoint,
    pub radius_meters: f64,
}

impl CircularGpsRegion {
    pub fn new(center: GeoJsonPoint, radius_meters: f64) -> Self {
        Self {
            center,
            radius_meters,
        }
    }
}

impl GpsRegion for CircularGpsRegion {
    fn boundaries(&self) -> GpsSides {
        bounding_box_from_circle(self.center.coordinates(), self.radius_meters).sides
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::distance;

    fn googleplex() -> GeoJsonPoint {
        GeoJsonPoint::new(-122.0862515, 37.4220041)
    }

    #[test]
    fn test_rectangular_contains() {
        let region = RectangularGpsRegion::new(GpsSides {
            top: 10.0,
            right: 20.0,
            bottom: -10.0,
            left: -20.0,
        });

        assert!(region.contains(&GeoJsonPoint::new(0.0, 0.0)));
        assert!(region.contains(&GeoJsonPoint::new(20.0, 10.0)));
        assert!(region.contains(&GeoJsonPoint::new(-20.0, -10.0)));
        assert!(!region.contains(&GeoJsonPoint::new(0.0, 10.5)));
        assert!(!region.contains(&GeoJsonPoint::new(0.0, -10.5)));
        assert!(!region.contains(&GeoJsonPoint::new(20.5, 0.0)));
        assert!(!region.contains(&GeoJsonPoint::new(-20.5, 0.0)));
    }

    #[test]
    fn test_rectangular_boundaries_verbatim() {
        let sides = GpsSides {
            top: 1.0,
            right: 2.0,
            bottom: 3.0,
            left: 4.0,
        };
        assert_eq!(RectangularGpsRegion::new(sides).boundaries(), sides);
    }

    #[test]
    fn test_circular_contains_center() {
        for radius in [0.5, 1.0, 500.0, 25_000.0] {
            let region = CircularGpsRegion::new(googleplex(), radius);
            assert!(region.contains(&googleplex()), "radius {}", radius);
        }
    }

    #[test]
    fn test_circular_is_square_not_circle() {
        let center = googleplex();
        let region = CircularGpsRegion::new(center, 500.0);
        let sides = region.boundaries();

        // corner of the square is outside the circle but still contained
        let corner = GeoJsonPoint::new(sides.right, sides.top);
        assert!(distance(Some(&center), Some(&corner)) > 500.0);
        assert!(region.contains(&corner));
    }

    #[test]
    fn test_circular_excludes_beyond_diagonal() {
        let center = googleplex();
        let region = CircularGpsRegion::new(center, 500.0);

        let far = GeoJsonPoint::new(-122.0762515, 37.4320041);
        assert!(distance(Some(&center), Some(&far)) > 500.0 * 2f64.sqrt());
        assert!(!region.contains(&far));

        let north = GeoJsonPoint::new(-122.0862515, 37.4320041);
        assert!(!region.contains(&north));
    }

    #[test]
    fn test_region_as_trait_object() {
        let regions: Vec<Box<dyn GpsRegion>> = vec![
            Box::new(CircularGpsRegion::new(googleplex(), 1000.0)),
            Box::new(RectangularGpsRegion::new(GpsSides {
                top: 38.0,
                right: -122.0,
                bottom: 37.0,
                left: -123.0,
            })),
        ];
        assert!(regions.iter().all(|r| r.contains(&googleplex())));
    }
}
