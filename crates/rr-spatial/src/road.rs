//! Road classes, the class filters used by the strategy ladder, and the
//! speed table that turns edge length into travel time.

/// OSM `highway=*` class of a road segment, restricted to car-drivable ways.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
#[repr(u8)]
pub enum RoadClass {
    Motorway,
    MotorwayLink,
    Trunk,
    TrunkLink,
    Primary,
    PrimaryLink,
    Secondary,
    SecondaryLink,
    Tertiary,
    TertiaryLink,
    Unclassified,
    Residential,
    LivingStreet,
    Service,
    /// Any other drivable tag.
    Other,
}

impl RoadClass {
    pub const ALL: [RoadClass; 15] = [
        RoadClass::Motorway,
        RoadClass::MotorwayLink,
        RoadClass::Trunk,
        RoadClass::TrunkLink,
        RoadClass::Primary,
        RoadClass::PrimaryLink,
        RoadClass::Secondary,
        RoadClass::SecondaryLink,
        RoadClass::Tertiary,
        RoadClass::TertiaryLink,
        RoadClass::Unclassified,
        RoadClass::Residential,
        RoadClass::LivingStreet,
        RoadClass::Service,
        RoadClass::Other,
    ];

    /// Parse an OSM `highway` value.  Returns `None` for ways a car cannot use.
    pub fn from_osm(highway: &str) -> Option<RoadClass> {
        let class = match highway {
            "motorway"       => RoadClass::Motorway,
            "motorway_link"  => RoadClass::MotorwayLink,
            "trunk"          => RoadClass::Trunk,
            "trunk_link"     => RoadClass::TrunkLink,
            "primary"        => RoadClass::Primary,
            "primary_link"   => RoadClass::PrimaryLink,
            "secondary"      => RoadClass::Secondary,
            "secondary_link" => RoadClass::SecondaryLink,
            "tertiary"       => RoadClass::Tertiary,
            "tertiary_link"  => RoadClass::TertiaryLink,
            "unclassified"   => RoadClass::Unclassified,
            "residential"    => RoadClass::Residential,
            "living_street"  => RoadClass::LivingStreet,
            "service"        => RoadClass::Service,
            "footway" | "path" | "cycleway" | "pedestrian" | "steps" | "track"
            | "bridleway" | "corridor" => return None,
            _ => RoadClass::Other,
        };
        Some(class)
    }

    /// Assumed car speed in km/h.
    pub fn speed_kmh(self) -> f64 {
        match self {
            RoadClass::Motorway | RoadClass::MotorwayLink => 100.0,
            RoadClass::Trunk | RoadClass::TrunkLink       => 100.0,
            RoadClass::Primary | RoadClass::PrimaryLink   => 100.0,
            RoadClass::Secondary | RoadClass::SecondaryLink => 80.0,
            RoadClass::Tertiary | RoadClass::TertiaryLink => 30.0,
            RoadClass::Residential                        => 40.0,
            RoadClass::Unclassified                       => 20.0,
            RoadClass::LivingStreet | RoadClass::Service  => 20.0,
            RoadClass::Other                              => 30.0,
        }
    }

    /// Car travel time in milliseconds for `length_m` metres of this class.
    pub fn travel_ms(self, length_m: f64) -> u32 {
        let mps = self.speed_kmh() / 3.6;
        (length_m / mps * 1_000.0).round() as u32
    }

    #[inline]
    fn bit(self) -> u32 {
        1 << (self as u8)
    }
}

// ── ClassFilter ───────────────────────────────────────────────────────────────

/// A set of road classes a graph builder keeps.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct ClassFilter(u32);

impl ClassFilter {
    pub fn of(classes: &[RoadClass]) -> Self {
        Self(classes.iter().fold(0, |acc, c| acc | c.bit()))
    }

    /// Motorways, trunks and primaries (with their links).
    pub fn primary_roads() -> Self {
        Self::of(&[
            RoadClass::Motorway,
            RoadClass::MotorwayLink,
            RoadClass::Trunk,
            RoadClass::TrunkLink,
            RoadClass::Primary,
            RoadClass::PrimaryLink,
        ])
    }

    /// Everything down to tertiary plus unclassified roads.  Excludes
    /// residential streets and service roads.
    pub fn main_roads() -> Self {
        Self::of(&[
            RoadClass::Motorway,
            RoadClass::MotorwayLink,
            RoadClass::Trunk,
            RoadClass::TrunkLink,
            RoadClass::Primary,
            RoadClass::PrimaryLink,
            RoadClass::Secondary,
            RoadClass::SecondaryLink,
            RoadClass::Tertiary,
            RoadClass::TertiaryLink,
            RoadClass::Unclassified,
        ])
    }

    pub fn all() -> Self {
        Self::of(&RoadClass::ALL)
    }

    #[inline]
    pub fn contains(self, class: RoadClass) -> bool {
        self.0 & class.bit() != 0
    }
}
