pub use shared::{
    ApiError, Coordinate, DifficultyBand, ElevatedPoint, ElevationSummary, HistorySample,
    LoopRequest, LoopResponse, MetricKind, PredictRequest, PredictResponse, RideAnalysis, Route,
    RouteBounds, RouteMetadata, StrategyKind, WeatherContext,
};
