pub mod error;
pub mod lifecycle;
pub mod models;
pub mod planner;
pub mod report;
pub mod rules;
pub mod spatial;

pub use error::{Entity, MissionError};
pub use lifecycle::{ensure_drone_ready, MissionAction};
pub use models::{
    CreateMissionRequest, Drone, DroneStatus, GeoPoint, Mission, MissionProgress, MissionStatus,
    PathPattern, PathPoint, Polygon, Waypoint,
};
pub use planner::{
    generate_path, generate_path_with_config, line_spacing_deg, line_spacing_m, CrosshatchMode,
    PlannerConfig, METERS_PER_DEGREE,
};
pub use report::{summarize_by_drone, DroneTotals, SurveyReport};
pub use rules::SimulationRules;
pub use spatial::haversine_distance;
