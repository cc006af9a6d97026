//! Worker thread to allow light classification to occur without blocking the main thread.

// -----------------------------------------------------------------------------------------------
// INCLUDES
// -----------------------------------------------------------------------------------------------

use std::{
    sync::mpsc::{channel, Receiver, Sender},
    thread::{self, JoinHandle},
};

use comms_if::eqpt::{
    cam::{CamFrame, CamImage},
    tl::{Classification, LightClass},
};
use log::warn;

use super::TlFusionError;

// -----------------------------------------------------------------------------------------------
// STRUCTS
// -----------------------------------------------------------------------------------------------

/// Handle to a running classifier worker.
pub struct ClassifierHandle {
    pub worker_jh: JoinHandle<Result<(), TlFusionError>>,

    pub worker_sender: Sender<WorkerSignal>,
    pub worker_reciever: Receiver<WorkerSignal>,
}

// -----------------------------------------------------------------------------------------------
// ENUMS
// -----------------------------------------------------------------------------------------------

#[derive(Debug)]
pub enum WorkerSignal {
    /// The worker should stop it's operations
    Stop,

    /// A new camera frame was acquired and should be classified
    NewFrame(Box<CamFrame>),

    /// The classifier produced a new observation of the upcoming light
    Observation(Classification),

    /// Unhandlable error
    Error(Box<TlFusionError>),
}

// -----------------------------------------------------------------------------------------------
// TRAITS
// -----------------------------------------------------------------------------------------------

/// Interface to a traffic light classifier.
///
/// Implementations take a decoded camera image and produce a classification of the upcoming
/// light. The classifier runs on the worker thread, so implementations are free to block.
pub trait TlClassifier: Send {
    fn classify(&mut self, image: &CamImage) -> Result<Classification, TlFusionError>;
}

// -----------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// -----------------------------------------------------------------------------------------------

/// Start a classifier worker thread around the given classifier.
pub fn spawn_classifier(
    classifier: Box<dyn TlClassifier>,
    confidence_threshold: f64,
) -> ClassifierHandle {
    // Create channels
    let (worker_sender, rx) = channel();
    let (tx, worker_reciever) = channel();

    // Start worker thread
    let worker_jh = thread::Builder::new()
        .name("tl_fusion::worker".into())
        .spawn(move || worker_thread(classifier, confidence_threshold, tx, rx))
        .unwrap();

    ClassifierHandle {
        worker_jh,
        worker_sender,
        worker_reciever,
    }
}

// -----------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// -----------------------------------------------------------------------------------------------

fn worker_thread(
    mut classifier: Box<dyn TlClassifier>,
    confidence_threshold: f64,
    main_sender: Sender<WorkerSignal>,
    main_reciever: Receiver<WorkerSignal>,
) -> Result<(), TlFusionError> {
    // Wait for frames from main
    while let Ok(signal) = main_reciever.recv() {
        // Process the signal
        match signal {
            WorkerSignal::Stop => break,
            WorkerSignal::NewFrame(frame) => {
                // Decode the frame into a usable image
                let image = match frame.to_cam_image() {
                    Ok(i) => i,
                    Err(e) => {
                        main_sender.send(WorkerSignal::Error(Box::new(
                            TlFusionError::ImageDecodeError(e),
                        )))?;
                        continue;
                    }
                };

                // Run the classifier over the image
                let mut classification = match classifier.classify(&image) {
                    Ok(c) => c,
                    Err(e) => {
                        main_sender.send(WorkerSignal::Error(Box::new(e)))?;
                        continue;
                    }
                };

                // Low confidence classifications are not trusted
                if classification.confidence < confidence_threshold {
                    classification.class = LightClass::Unknown;
                }

                main_sender.send(WorkerSignal::Observation(classification))?;
            }
            _ => warn!("Unexpected signal from main thread: {:?}", signal),
        }
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use comms_if::eqpt::cam::ImageFormat;
    use image::DynamicImage;

    /// Classifier returning a fixed classification for every frame
    struct FixedClassifier(Classification);

    impl TlClassifier for FixedClassifier {
        fn classify(&mut self, _image: &CamImage) -> Result<Classification, TlFusionError> {
            Ok(self.0)
        }
    }

    fn test_frame() -> CamFrame {
        let image = CamImage {
            timestamp: Utc::now(),
            image: DynamicImage::new_rgb8(4, 4),
        };

        image.to_cam_frame(ImageFormat::Png).unwrap()
    }

    #[test]
    fn test_classify_frame() {
        let handle = spawn_classifier(
            Box::new(FixedClassifier(Classification {
                class: LightClass::Red,
                confidence: 0.9,
            })),
            0.25,
        );

        handle
            .worker_sender
            .send(WorkerSignal::NewFrame(Box::new(test_frame())))
            .unwrap();

        match handle.worker_reciever.recv().unwrap() {
            WorkerSignal::Observation(c) => assert_eq!(c.class, LightClass::Red),
            s => panic!("Unexpected signal: {:?}", s),
        }

        handle.worker_sender.send(WorkerSignal::Stop).unwrap();
        handle.worker_jh.join().unwrap().unwrap();
    }

    #[test]
    fn test_low_confidence_is_unknown() {
        let handle = spawn_classifier(
            Box::new(FixedClassifier(Classification {
                class: LightClass::Green,
                confidence: 0.1,
            })),
            0.25,
        );

        handle
            .worker_sender
            .send(WorkerSignal::NewFrame(Box::new(test_frame())))
            .unwrap();

        match handle.worker_reciever.recv().unwrap() {
            WorkerSignal::Observation(c) => {
                assert_eq!(c.class, LightClass::Unknown);
                assert_eq!(c.confidence, 0.1);
            }
            s => panic!("Unexpected signal: {:?}", s),
        }

        handle.worker_sender.send(WorkerSignal::Stop).unwrap();
        handle.worker_jh.join().unwrap().unwrap();
    }
}
