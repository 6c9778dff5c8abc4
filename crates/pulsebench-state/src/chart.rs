use log::{debug, warn};

use crate::{Channel, ChannelId, State};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimeScale {
    Seconds,
    Milliseconds,
    Microseconds,
}

impl TimeScale {
    /// Sub-millisecond spans read best in microseconds, sub-second spans in
    /// milliseconds. Both boundaries are strict: a span of exactly one
    /// millisecond is shown in milliseconds.
    pub fn for_span(span_seconds: f64) -> Self {
        if span_seconds < 1e-3 {
            TimeScale::Microseconds
        } else if span_seconds < 1.0 {
            TimeScale::Milliseconds
        } else {
            TimeScale::Seconds
        }
    }

    pub fn factor(self) -> f64 {
        match self {
            TimeScale::Seconds => 1.0,
            TimeScale::Milliseconds => 1e3,
            TimeScale::Microseconds => 1e6,
        }
    }

    pub fn axis_label(self) -> &'static str {
        match self {
            TimeScale::Seconds => "time [s]",
            TimeScale::Milliseconds => "time [ms]",
            TimeScale::Microseconds => "time [\u{3bc}s]",
        }
    }
}

/// One channel's lane in the chart. `points` are `(time, value)` pairs for a
/// step plot, times already scaled to the chart's `TimeScale` and values
/// offset so the lane occupies `[offset, offset + 1]`. `None` means the
/// channel has nothing to show in the window and should render as an empty
/// lane rather than a flat trace.
#[derive(Clone, Debug, PartialEq)]
pub struct ChannelSeries {
    pub channel: ChannelId,
    pub offset: usize,
    pub points: Option<Vec<(f64, f64)>>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TimingChart {
    pub scale: TimeScale,
    /// Window edges in scaled time, for the x axis range.
    pub start: f64,
    pub end: f64,
    pub series: Vec<ChannelSeries>,
    /// Emphasized `[from, to]` spans on the focus channel, scaled.
    pub highlights: Vec<(f64, f64)>,
}

/// Projects the window `[start_segment, end_segment)` of the focus channel's
/// timeline onto every channel in `display_order`.
///
/// The window is resolved on the focus channel's own cumulative timeline;
/// each displayed channel is then clipped against the resulting time range
/// independently, synthesizing edge points so every step function starts and
/// ends exactly at the window boundaries.
pub fn project(
    state: &State,
    display_order: &[ChannelId],
    focus: ChannelId,
    start_segment: usize,
    end_segment: usize,
    highlighted: &[usize],
) -> TimingChart {
    let focus_times = state
        .channel(focus)
        .map(Channel::timeline)
        .unwrap_or_else(|| vec![0.0]);

    let last_boundary = focus_times.len() - 1;
    if start_segment > last_boundary || end_segment > last_boundary {
        warn!(
            "chart window [{start_segment}, {end_segment}] exceeds the {} segments of {focus}",
            last_boundary
        );
    }
    let start_segment = start_segment.min(last_boundary);
    let end_segment = end_segment.min(last_boundary);

    let start_time = focus_times[start_segment];
    let end_time = focus_times[end_segment];

    let scale = TimeScale::for_span(end_time - start_time);
    let factor = scale.factor();

    let series = display_order
        .iter()
        .enumerate()
        .map(|(offset, &id)| ChannelSeries {
            channel: id,
            offset,
            points: state
                .channel(id)
                .and_then(|channel| step_points(channel, start_time, end_time, offset, factor)),
        })
        .collect();

    let highlights = highlighted
        .iter()
        .filter_map(|&index| {
            if index < start_segment || index >= end_segment {
                debug!("highlight {index} lies outside the visible window, skipped");
                return None;
            }
            Some((focus_times[index] * factor, focus_times[index + 1] * factor))
        })
        .collect();

    TimingChart {
        scale,
        start: start_time * factor,
        end: end_time * factor,
        series,
        highlights,
    }
}

fn step_points(
    channel: &Channel,
    start_time: f64,
    end_time: f64,
    offset: usize,
    factor: f64,
) -> Option<Vec<(f64, f64)>> {
    if channel.is_empty() {
        return None;
    }

    let times = channel.timeline();
    let levels: Vec<f64> = channel
        .segments()
        .iter()
        .map(|segment| segment.level().bit() as f64)
        .collect();

    // first boundary at or after each window edge; no boundary at or after
    // the start means the channel ended before the window opened
    let sub_start = times.iter().position(|&t| t >= start_time)?;
    let sub_end = times
        .iter()
        .position(|&t| t >= end_time)
        .unwrap_or(times.len() - 1);

    if sub_start >= sub_end {
        // the window falls inside a single run or past the channel's end
        return None;
    }

    let mut points: Vec<(f64, f64)> = (sub_start..sub_end)
        .map(|index| (times[index], levels[index]))
        .collect();

    // pin the step function to the exact window edges, carrying the level
    // that was active just before each edge
    if sub_start > 0 && points[0].0 != start_time {
        points.insert(0, (start_time, levels[sub_start - 1]));
    }
    if points.last().unwrap().0 != end_time {
        points.push((end_time, levels[sub_end - 1]));
    }

    Some(
        points
            .into_iter()
            .map(|(time, level)| (time * factor, level + offset as f64))
            .collect(),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{Level, Segment, TimeUnit};

    fn seg(level: Level, duration: f64, unit: TimeUnit) -> Segment {
        Segment::new(level, duration, unit).unwrap()
    }

    fn ch(id: u8) -> ChannelId {
        ChannelId::new(id).unwrap()
    }

    fn example_state() -> State {
        let mut state = State::new();
        state.set_channel_segments(
            ch(0),
            vec![
                seg(Level::High, 1.0, TimeUnit::Milliseconds),
                seg(Level::Low, 1.0, TimeUnit::Milliseconds),
            ],
        );
        state.set_channel_segments(ch(1), vec![]);
        state
    }

    #[test]
    fn window_clips_to_a_single_step() {
        let chart = project(&example_state(), &[ch(0)], ch(0), 0, 1, &[]);

        // a span of exactly one millisecond is not sub-millisecond
        assert_eq!(chart.scale, TimeScale::Milliseconds);

        let points = chart.series[0].points.as_ref().unwrap();
        assert_eq!(points.len(), 2);

        let (start, level) = points[0];
        assert!((start - 0.0).abs() < 1e-9);
        assert!((level - 1.0).abs() < 1e-9);

        let (end, level) = points[1];
        assert!((end - 1.0).abs() < 1e-9, "end should scale to 1 ms");
        assert!((level - 1.0).abs() < 1e-9);
    }

    #[test]
    fn scale_boundaries_are_strict() {
        assert_eq!(TimeScale::for_span(0.5e-3), TimeScale::Microseconds);
        assert_eq!(TimeScale::for_span(1e-3), TimeScale::Milliseconds);
        assert_eq!(TimeScale::for_span(0.999), TimeScale::Milliseconds);
        assert_eq!(TimeScale::for_span(1.0), TimeScale::Seconds);
        assert_eq!(TimeScale::for_span(2.5), TimeScale::Seconds);
    }

    #[test]
    fn empty_channels_yield_placeholder_lanes() {
        let chart = project(&example_state(), &[ch(0), ch(1)], ch(0), 0, 2, &[]);

        assert!(chart.series[0].points.is_some());
        assert_eq!(chart.series[1].points, None);
        assert_eq!(chart.series[1].offset, 1);
    }

    #[test]
    fn channels_outside_the_window_yield_placeholder_lanes() {
        let mut state = example_state();
        // one short pulse that is over before the window starts
        state.set_channel_segments(
            ch(2),
            vec![seg(Level::High, 0.5, TimeUnit::Milliseconds)],
        );

        let chart = project(&state, &[ch(0), ch(2)], ch(0), 1, 2, &[]);

        assert!(chart.series[0].points.is_some());
        assert_eq!(chart.series[1].points, None);
    }

    #[test]
    fn lanes_are_stacked_by_display_position() {
        let mut state = State::new();
        for id in [4, 7] {
            state.set_channel_segments(
                ch(id),
                vec![seg(Level::High, 1.0, TimeUnit::Milliseconds)],
            );
        }

        let chart = project(&state, &[ch(7), ch(4)], ch(7), 0, 1, &[]);

        let high_in_lane_zero = chart.series[0].points.as_ref().unwrap()[0].1;
        let high_in_lane_one = chart.series[1].points.as_ref().unwrap()[0].1;
        assert!((high_in_lane_zero - 1.0).abs() < 1e-9);
        assert!((high_in_lane_one - 2.0).abs() < 1e-9);
    }

    #[test]
    fn edge_points_carry_the_previous_level() {
        let mut state = State::new();
        state.set_channel_segments(
            ch(0),
            vec![
                seg(Level::Low, 1.0, TimeUnit::Milliseconds),
                seg(Level::High, 1.0, TimeUnit::Milliseconds),
                seg(Level::Low, 1.0, TimeUnit::Milliseconds),
                seg(Level::High, 1.0, TimeUnit::Milliseconds),
            ],
        );
        // a second channel with coarser boundaries straddling the window
        state.set_channel_segments(
            ch(1),
            vec![
                seg(Level::High, 1.5, TimeUnit::Milliseconds),
                seg(Level::Low, 2.5, TimeUnit::Milliseconds),
            ],
        );

        let chart = project(&state, &[ch(0), ch(1)], ch(0), 1, 3, &[]);
        assert_eq!(chart.scale, TimeScale::Milliseconds);

        // channel 1 has one boundary inside [1ms, 3ms): at 1.5ms. Both window
        // edges are synthesized: the start carries the high first segment,
        // the end carries the low second segment.
        let points = chart.series[1].points.as_ref().unwrap();
        assert_eq!(points.len(), 3);

        assert!((points[0].0 - 1.0).abs() < 1e-9);
        assert!((points[0].1 - 2.0).abs() < 1e-9, "high, offset by lane 1");
        assert!((points[1].0 - 1.5).abs() < 1e-9);
        assert!((points[1].1 - 1.0).abs() < 1e-9, "low, offset by lane 1");
        assert!((points[2].0 - 3.0).abs() < 1e-9);
        assert!((points[2].1 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn highlights_resolve_to_segment_spans() {
        let mut state = State::new();
        state.set_channel_segments(
            ch(0),
            vec![
                seg(Level::High, 1.0, TimeUnit::Milliseconds),
                seg(Level::Low, 2.0, TimeUnit::Milliseconds),
                seg(Level::High, 1.0, TimeUnit::Milliseconds),
            ],
        );

        let chart = project(&state, &[ch(0)], ch(0), 0, 3, &[1, 5]);

        // index 5 is outside the window and silently dropped
        assert_eq!(chart.highlights.len(), 1);
        let (from, to) = chart.highlights[0];
        assert!((from - 1.0).abs() < 1e-9);
        assert!((to - 3.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_window_is_clamped() {
        let chart = project(&example_state(), &[ch(0)], ch(0), 0, 99, &[]);

        // clamps to the full two-segment timeline
        assert!((chart.end - 2.0).abs() < 1e-9);
    }

    #[test]
    fn missing_focus_channel_projects_an_empty_window() {
        let state = example_state();
        let chart = project(&state, &[ch(0)], ch(5), 0, 1, &[]);

        assert_eq!(chart.start, 0.0);
        assert_eq!(chart.end, 0.0);
        assert!(chart.series.iter().all(|series| series.points.is_none()));
    }
}
