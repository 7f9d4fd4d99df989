use geo_types::{coord, Line};

use crate::{
    channel::Channel,
    gradient::{ColorGradient, Rgb},
    telemetry::Route,
};

/// One drawn piece of the route, colored by the channel value at its start.
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    pub line: Line,
    pub value: f64,
    pub color: Rgb,
}

/// Splits the route into `len - 1` consecutive segments.
pub fn segments(route: &Route, channel: Channel, gradient: &ColorGradient) -> Vec<Segment> {
    route
        .samples()
        .windows(2)
        .map(|pair| {
            let (from, to) = (&pair[0], &pair[1]);
            let value = channel.value(from);
            Segment {
                line: Line::new(
                    coord! { x: from.longitude, y: from.latitude },
                    coord! { x: to.longitude, y: to.latitude },
                ),
                value,
                color: gradient.color(value),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::tests::sample;

    fn route(n: usize) -> Route {
        let samples = (0..n)
            .map(|i| sample(i as u64 * 500, 43.0 + i as f64 * 1e-4, -81.27, 1000 + 500 * i as u32))
            .collect();
        Route::from_samples(samples).unwrap()
    }

    #[test]
    fn one_fewer_than_points() {
        let gradient = Channel::Rpm.default_gradient();
        for n in 1..10 {
            let segments = segments(&route(n), Channel::Rpm, &gradient);
            assert_eq!(segments.len(), n.saturating_sub(1));
        }
    }

    #[test]
    fn colored_by_start_point() {
        let gradient = Channel::Rpm.default_gradient();
        let route = route(4);
        let segments = segments(&route, Channel::Rpm, &gradient);
        for (segment, pair) in segments.iter().zip(route.samples().windows(2)) {
            assert_eq!(segment.value, pair[0].rpm as f64);
            assert_eq!(segment.color, gradient.color(pair[0].rpm as f64));
            assert_eq!(segment.line.start.y, pair[0].latitude);
            assert_eq!(segment.line.end.y, pair[1].latitude);
        }
    }

    #[test]
    fn middle_sentinel_leaves_one_segment() {
        let samples = vec![
            sample(0, 43.0095, -81.2735, 1000),
            sample(500, 0.0, 0.0, 5200),
            sample(1000, 43.0090, -81.2738, 6800),
        ];
        let route = Route::from_samples(samples).unwrap();
        let segments = segments(&route, Channel::Speed, &Channel::Speed.default_gradient());
        assert_eq!(segments.len(), 1);
        assert_eq!(segments[0].line.end.x, -81.2738);
    }
}
