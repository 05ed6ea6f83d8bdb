use serde::Serialize;

use crate::classify::MediaClass;

/// Named processing stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Stage {
    Transcode,
    Transcribe,
    Ingest,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Transcode, Stage::Transcribe, Stage::Ingest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Transcode => "transcode",
            Stage::Transcribe => "transcribe",
            Stage::Ingest => "ingest",
        }
    }

    /// Class of objects that trigger the stage
    pub fn trigger(&self) -> MediaClass {
        match self {
            Stage::Transcode => MediaClass::Video,
            Stage::Transcribe => MediaClass::Audio,
            Stage::Ingest => MediaClass::TranscriptJson,
        }
    }

    /// Stage triggered by an object of `class`, if any
    pub fn for_class(class: MediaClass) -> Option<Stage> {
        Stage::ALL.into_iter().find(|stage| stage.trigger() == class)
    }

    /// Stages fed by the objects this stage writes.
    ///
    /// Video renditions written by `Transcode` are excluded by the transcode trigger guard,
    /// so only the audio rendition feeds another stage.
    pub fn downstream(&self) -> &'static [Stage] {
        match self {
            Stage::Transcode => &[Stage::Transcribe],
            Stage::Transcribe => &[Stage::Ingest],
            Stage::Ingest => &[],
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Longest chain of stages reachable from `stage`, or `None` if the graph loops
pub fn chain_length(stage: Stage) -> Option<usize> {
    fn visit(stage: Stage, path: &mut Vec<Stage>) -> Option<usize> {
        if path.contains(&stage) {
            return None;
        }
        path.push(stage);
        let mut longest = 0;
        for next in stage.downstream() {
            longest = longest.max(visit(*next, path)?);
        }
        path.pop();
        Some(longest + 1)
    }

    visit(stage, &mut Vec::new())
}
