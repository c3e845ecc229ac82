use crate::models::IssueModel;
use crate::utils::geo::{haversine_meters, latitude_gap_meters, GeoPoint};

/// Absorbs rounding differences between the two distance formulas.
const PREFILTER_SLACK_METERS: f64 = 0.001;

/// Keeps only issues within `radius_meters` (inclusive) of an origin.
#[derive(Debug, Clone, Copy)]
pub struct ProximityFilter {
    radius_meters: f64,
}

impl ProximityFilter {
    pub fn new(radius_meters: f64) -> Self {
        Self { radius_meters }
    }

    pub fn radius_meters(&self) -> f64 {
        self.radius_meters
    }

    pub fn contains(&self, origin: GeoPoint, point: GeoPoint) -> bool {
        // The meridian gap alone already rules out most of a city-wide pool.
        if latitude_gap_meters(origin, point) > self.radius_meters + PREFILTER_SLACK_METERS {
            return false;
        }
        haversine_meters(origin, point) <= self.radius_meters
    }

    pub fn filter<'a, I>(&self, origin: GeoPoint, pool: I) -> impl Iterator<Item = &'a IssueModel>
    where
        I: IntoIterator<Item = &'a IssueModel>,
    {
        let this = *self;
        pool.into_iter().filter(move |issue| {
            this.contains(
                origin,
                GeoPoint {
                    lat: issue.latitude,
                    lng: issue.longitude,
                },
            )
        })
    }
}
