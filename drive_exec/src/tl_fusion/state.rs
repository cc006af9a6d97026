//! Implementations for the TlFusion state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{trace, warn};
use serde::Serialize;
use std::sync::Arc;

// Internal
use super::{
    Params, TlFusionError, STATE_COUNT_THRESHOLD,
    worker::{self, ClassifierHandle, TlClassifier}};
use crate::route::RouteIndex;
use comms_if::eqpt::tl::{Classification, LightClass, LightState};
use util::{
    maths,
    params,
    module::State,
    archive::{Archived, Archiver},
    session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Traffic light fusion module state
#[derive(Default)]
pub struct TlFusion {

    pub(crate) params: Params,

    route_index: Option<Arc<RouteIndex>>,

    /// Route waypoint of each stop line, in the same order as the stop lines
    /// in the parameter file.
    stop_line_wp_idxs: Vec<usize>,

    /// The class currently accumulating agreement in the debouncer.
    candidate_class: LightClass,

    /// Number of consecutive frames that agreed on `candidate_class`.
    state_count: u32,

    /// The class last committed by the debouncer.
    committed_class: LightClass,

    pub(crate) report: StatusReport,
    arch_report: Archiver,

    /// The decision published on the last cycle with a committed class.
    output: OutputData,
    arch_output: Archiver
}

/// Input data to Traffic light fusion.
#[derive(Default)]
pub struct InputData {
    /// The route waypoint the vehicle is currently at.
    pub car_wp_idx: usize,

    /// The light observation for this cycle, or `None` if no new observation
    /// arrived.
    pub observation: Option<Observation>,

    /// Whether the observation source has produced at least one observation
    /// so far. While this is false the module assumes the worst and demands
    /// a stop at the next stop line.
    pub source_alive: bool
}

/// A single observation of the traffic lights.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// A classification of the upcoming light from the camera classifier.
    Classified(Classification),

    /// Ground truth state of every light, as published by the simulator.
    SimLights(Vec<LightState>)
}

/// Output decision from TlFusion, consumed by the trajectory planner.
#[derive(Clone, Copy, Serialize, Debug, PartialEq)]
pub struct OutputData {
    /// Route waypoint of the stop line the vehicle must halt at, or -1 if
    /// there is nothing to stop for.
    pub stop_wp_idx: i64,

    /// The debounced class of the upcoming light.
    pub class: LightClass
}

impl Default for OutputData {
    fn default() -> Self {
        OutputData {
            stop_wp_idx: -1,
            class: LightClass::Unknown
        }
    }
}

/// Status report for TlFusion processing.
#[derive(Clone, Copy, Default, Serialize, Debug)]
pub struct StatusReport {
    /// True if the module is running without a live observation source.
    pub fail_safe: bool,

    /// The raw (pre-debounce) class seen this cycle.
    pub raw_class: LightClass,

    /// Current agreement count of the debouncer.
    pub state_count: u32
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for TlFusion {
    type InitData = (&'static str, Arc<RouteIndex>);
    type InitError = params::LoadError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = super::TlFusionError;

    /// Initialise the TlFusion module.
    ///
    /// Expected init data is the path to the parameter file and the shared
    /// route index.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        let (params_path, route_index) = init_data;

        // Load the parameters
        self.params = match params::load(params_path) {
            Ok(p) => p,
            Err(e) => return Err(e)
        };

        // Map each stop line onto its closest route waypoint
        for stop_line_pos_m in self.params.stop_line_pos_m.iter() {
            let wp_idx = route_index.nearest(
                &nalgebra::Vector2::new(stop_line_pos_m[0], stop_line_pos_m[1])
            );

            let wp_pos_m = route_index.get_route().waypoints[wp_idx]
                .position2();

            if let Some(dist_m) = maths::norm(
                stop_line_pos_m,
                &[wp_pos_m[0], wp_pos_m[1]]
            ) {
                if dist_m > self.params.max_stop_line_wp_dist_m {
                    warn!(
                        "Stop line at {:?} is {:.2} m from its closest route \
                        waypoint ({})",
                        stop_line_pos_m, dist_m, wp_idx
                    );
                }
            }

            self.stop_line_wp_idxs.push(wp_idx);
        }

        self.route_index = Some(route_index);

        // Create the arch folder for tl_fusion
        let mut arch_path = session.arch_root.clone();
        arch_path.push("tl_fusion");
        std::fs::create_dir_all(arch_path).unwrap();

        // Initialise the archivers
        self.arch_report = Archiver::from_path(
            session, "tl_fusion/status_report.csv"
        ).unwrap();
        self.arch_output = Archiver::from_path(
            session, "tl_fusion/output.csv"
        ).unwrap();

        Ok(())
    }

    /// Perform cyclic processing of Traffic light fusion.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        // Clear the status report
        self.report = StatusReport::default();

        let route_index = match self.route_index {
            Some(ref ri) => ri,
            None => return Err(TlFusionError::NotInitialised)
        };

        // Locate the next stop line along the route
        let next = route_index.next_stop_line(
            input_data.car_wp_idx,
            &self.stop_line_wp_idxs
        );

        // Without a live observation source the only safe assumption is a
        // red light at the next stop line. The debouncer is left untouched
        // so a recovering source resumes where it left off.
        if !input_data.source_alive {
            self.report.fail_safe = true;
            self.report.state_count = self.state_count;

            let output = OutputData {
                stop_wp_idx: match next {
                    Some((stop_wp_idx, _)) => stop_wp_idx as i64,
                    None => -1
                },
                class: LightClass::Red
            };

            return Ok((output, self.report));
        }

        // Derive the raw class for this cycle from the observation
        let raw_class = match input_data.observation {
            Some(Observation::Classified(ref classification)) => {
                classification.class
            },
            Some(Observation::SimLights(ref lights)) => {
                // Ground truth carries one state per stop line, pick the one
                // at the next stop line
                if lights.len() != self.stop_line_wp_idxs.len() {
                    return Err(TlFusionError::StopLineCountMismatch {
                        num_lights: lights.len(),
                        num_stop_lines: self.stop_line_wp_idxs.len()
                    });
                }

                match next {
                    Some((_, line_idx)) => lights[line_idx].class,
                    None => LightClass::Unknown
                }
            },
            None => {
                // No new observation this cycle, hold the previous decision
                self.report.state_count = self.state_count;

                return Ok((self.output, self.report));
            }
        };

        // Debounce: a class is only committed once it has been seen on
        // STATE_COUNT_THRESHOLD consecutive frames
        if raw_class == self.candidate_class {
            self.state_count = self.state_count.saturating_add(1);
        }
        else {
            self.candidate_class = raw_class;
            self.state_count = 1;
        }

        let output = if self.state_count >= STATE_COUNT_THRESHOLD {
            self.committed_class = self.candidate_class;

            // Only a committed red demands a stop
            match (self.committed_class, next) {
                (LightClass::Red, Some((stop_wp_idx, _))) => OutputData {
                    stop_wp_idx: stop_wp_idx as i64,
                    class: LightClass::Red
                },
                (class, _) => OutputData {
                    stop_wp_idx: -1,
                    class
                }
            }
        }
        else {
            // Not yet committed, hold the previous decision
            self.output
        };

        self.report.raw_class = raw_class;
        self.report.state_count = self.state_count;

        trace!(
            "TlFusion raw: {:?}, count: {}, output: {:?}",
            raw_class,
            self.state_count,
            output
        );

        // Update the output in self
        self.output = output;

        Ok((output, self.report))
    }
}

impl TlFusion {

    /// Start a classifier worker around the given classifier.
    ///
    /// The worker applies the module's configured confidence threshold, so
    /// low confidence classifications arrive as `Unknown` observations.
    pub fn spawn_classifier(
        &self,
        classifier: Box<dyn TlClassifier>
    ) -> ClassifierHandle {
        worker::spawn_classifier(
            classifier,
            self.params.confidence_threshold
        )
    }
}

impl Archived for TlFusion {
    fn write(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Write each one individually
        self.arch_report.serialise(self.report)?;
        self.arch_output.serialise(self.output)?;

        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::route::{Route, Waypoint};
    use nalgebra::Vector3;

    /// Build a fusion state over a straight route with a single stop line,
    /// skipping the parameter and archive setup done by init.
    fn fusion_with_stop_at(stop_wp_idx: usize, num_wps: usize) -> TlFusion {
        let waypoints = (0..num_wps)
            .map(|i| Waypoint {
                position_m: Vector3::new(i as f64, 0.0, 0.0),
                yaw_rad: 0.0,
                speed_ms: 5.0
            })
            .collect();

        let route = Arc::new(Route::from_waypoints(waypoints).unwrap());

        TlFusion {
            route_index: Some(Arc::new(RouteIndex::build(route).unwrap())),
            stop_line_wp_idxs: vec![stop_wp_idx],
            ..Default::default()
        }
    }

    fn sim_lights(class: LightClass) -> InputData {
        InputData {
            car_wp_idx: 10,
            observation: Some(Observation::SimLights(vec![LightState {
                x_m: 40.0,
                y_m: 0.0,
                class
            }])),
            source_alive: true
        }
    }

    #[test]
    fn test_red_commits_on_third_frame() {
        let mut fusion = fusion_with_stop_at(40, 50);
        let input = sim_lights(LightClass::Red);

        // The first two agreeing frames hold the default decision
        for _ in 0..2 {
            let (output, _) = fusion.proc(&input).unwrap();
            assert_eq!(output.stop_wp_idx, -1);
        }

        let (output, report) = fusion.proc(&input).unwrap();
        assert_eq!(output.stop_wp_idx, 40);
        assert_eq!(output.class, LightClass::Red);
        assert_eq!(report.state_count, STATE_COUNT_THRESHOLD);
    }

    #[test]
    fn test_green_clears_stop() {
        let mut fusion = fusion_with_stop_at(40, 50);

        for _ in 0..3 {
            fusion.proc(&sim_lights(LightClass::Red)).unwrap();
        }

        // Two green frames are not enough to lift the stop
        for _ in 0..2 {
            let (output, _) = fusion.proc(&sim_lights(LightClass::Green)).unwrap();
            assert_eq!(output.stop_wp_idx, 40);
            assert_eq!(output.class, LightClass::Red);
        }

        let (output, _) = fusion.proc(&sim_lights(LightClass::Green)).unwrap();
        assert_eq!(output.stop_wp_idx, -1);
        assert_eq!(output.class, LightClass::Green);
    }

    #[test]
    fn test_hold_without_observation() {
        let mut fusion = fusion_with_stop_at(40, 50);

        for _ in 0..3 {
            fusion.proc(&sim_lights(LightClass::Red)).unwrap();
        }

        let input = InputData {
            car_wp_idx: 10,
            observation: None,
            source_alive: true
        };

        let (output, report) = fusion.proc(&input).unwrap();
        assert_eq!(output.stop_wp_idx, 40);
        assert_eq!(report.state_count, STATE_COUNT_THRESHOLD);
    }

    #[test]
    fn test_fail_safe_without_source() {
        let mut fusion = fusion_with_stop_at(40, 50);

        let input = InputData {
            car_wp_idx: 10,
            observation: None,
            source_alive: false
        };

        let (output, report) = fusion.proc(&input).unwrap();
        assert!(report.fail_safe);
        assert_eq!(output.stop_wp_idx, 40);
        assert_eq!(output.class, LightClass::Red);

        // The debouncer must not have moved
        assert_eq!(fusion.state_count, 0);
    }

    #[test]
    fn test_stop_line_behind_is_ignored() {
        let mut fusion = fusion_with_stop_at(5, 50);

        for _ in 0..3 {
            let (output, _) = fusion.proc(&sim_lights(LightClass::Red)).unwrap();
            assert_eq!(output.stop_wp_idx, -1);
        }
    }

    #[test]
    fn test_spawned_classifier_uses_configured_threshold() {
        use super::super::WorkerSignal;
        use chrono::Utc;
        use comms_if::eqpt::cam::{CamImage, ImageFormat};
        use image::DynamicImage;

        /// Classifier always unsure of what it saw
        struct HesitantClassifier;

        impl TlClassifier for HesitantClassifier {
            fn classify(&mut self, _image: &CamImage)
                -> Result<Classification, TlFusionError>
            {
                Ok(Classification {
                    class: LightClass::Green,
                    confidence: 0.2
                })
            }
        }

        let fusion = TlFusion {
            params: Params {
                confidence_threshold: 0.25,
                ..Default::default()
            },
            ..Default::default()
        };

        let handle = fusion.spawn_classifier(Box::new(HesitantClassifier));

        let image = CamImage {
            timestamp: Utc::now(),
            image: DynamicImage::new_rgb8(4, 4)
        };
        let frame = image.to_cam_frame(ImageFormat::Png).unwrap();

        handle
            .worker_sender
            .send(WorkerSignal::NewFrame(Box::new(frame)))
            .unwrap();

        // The 0.2 confidence green falls below the module's threshold
        match handle.worker_reciever.recv().unwrap() {
            WorkerSignal::Observation(c) => {
                assert_eq!(c.class, LightClass::Unknown);
            }
            s => panic!("Unexpected signal: {:?}", s)
        }

        handle.worker_sender.send(WorkerSignal::Stop).unwrap();
        handle.worker_jh.join().unwrap().unwrap();
    }

    #[test]
    fn test_light_count_mismatch() {
        let mut fusion = fusion_with_stop_at(40, 50);

        let input = InputData {
            car_wp_idx: 10,
            observation: Some(Observation::SimLights(vec![
                LightState { x_m: 40.0, y_m: 0.0, class: LightClass::Red },
                LightState { x_m: 45.0, y_m: 0.0, class: LightClass::Red }
            ])),
            source_alive: true
        };

        assert!(matches!(
            fusion.proc(&input),
            Err(TlFusionError::StopLineCountMismatch { .. })
        ));
    }
}
