// Monitor kinds and the chart layout each one renders

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisPosition {
    Left,
    Right,
}

/// Display range of a series' axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AxisRange {
    /// Starting range, widened by the chart when data falls outside it
    Suggested { min: f64, max: f64 },
    /// Hard bounds
    Fixed { min: f64, max: f64 },
}

/// How one value series of a monitor is drawn.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesSpec {
    pub label: String,
    pub axis_id: String,
    pub position: AxisPosition,
    pub range: AxisRange,
    pub color: String,
    pub fill: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorKind {
    /// Temperature and humidity on a dual-axis chart
    Climate,
}

impl MonitorKind {
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "climate" => Some(MonitorKind::Climate),
            _ => None,
        }
    }

    pub fn tag(&self) -> &'static str {
        match self {
            MonitorKind::Climate => "climate",
        }
    }

    /// Number of value fields each sample carries for this kind
    pub fn series_count(&self) -> usize {
        match self {
            MonitorKind::Climate => 2,
        }
    }

    pub fn series_specs(&self) -> Vec<SeriesSpec> {
        match self {
            MonitorKind::Climate => vec![
                SeriesSpec {
                    label: "Temperature (°C)".to_string(),
                    axis_id: "temperature".to_string(),
                    position: AxisPosition::Left,
                    range: AxisRange::Suggested { min: 0.0, max: 10.0 },
                    color: "rgba(235,0,78,0.9)".to_string(),
                    fill: false,
                },
                SeriesSpec {
                    label: "Humidity (%)".to_string(),
                    axis_id: "humidity".to_string(),
                    position: AxisPosition::Right,
                    range: AxisRange::Fixed {
                        min: 0.0,
                        max: 100.0,
                    },
                    color: "rgba(0,156,235,0.9)".to_string(),
                    fill: true,
                },
            ],
        }
    }
}
