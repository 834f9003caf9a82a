//! In-memory backend that records every call, for orchestration tests.

use std::collections::BTreeSet;

use camblur_gpu_shared::uniforms::MotionBlurUniforms;

use crate::backend::{Capabilities, FrameTemporaries, MotionBlurBackend, PassRequest};
use crate::exclusion::ExclusionCamera;
use crate::extent::Extent;
use crate::plan::{ShaderPass, Surface};
use crate::settings::{LayerMask, TextureHandle};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedTemporary {
    pub id: u32,
    pub label: &'static str,
    pub extent: Extent,
    pub format: wgpu::TextureFormat,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    Pass {
        pass: ShaderPass,
        input: Surface,
        output: Surface,
        uniforms: MotionBlurUniforms,
        noise: Option<TextureHandle>,
    },
    Clear { id: u32 },
    Excluded { camera: String, mask: LayerMask, target: u32 },
    Blit,
}

pub struct RecordingBackend {
    pub capabilities: Capabilities,
    pub source: Extent,
    pub acquired: Vec<RecordedTemporary>,
    pub live: BTreeSet<u32>,
    pub events: Vec<Event>,
    next_id: u32,
}

impl RecordingBackend {
    pub fn new(source: Extent) -> Self {
        Self {
            capabilities: Capabilities::FULL,
            source,
            acquired: Vec::new(),
            live: BTreeSet::new(),
            events: Vec::new(),
            next_id: 1,
        }
    }

    pub fn passes(&self) -> Vec<ShaderPass> {
        self.events
            .iter()
            .filter_map(|e| match e {
                Event::Pass { pass, .. } => Some(*pass),
                _ => None,
            })
            .collect()
    }

    pub fn temporary(&self, label: &str) -> Option<&RecordedTemporary> {
        self.acquired.iter().rev().find(|t| t.label == label)
    }
}

impl MotionBlurBackend for RecordingBackend {
    type Frame = ();
    type Temporary = RecordedTemporary;

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn source_extent(&self, _frame: &()) -> Extent {
        self.source
    }

    fn acquire_temporary(&mut self, label: &'static str, extent: Extent, format: wgpu::TextureFormat) -> RecordedTemporary {
        let temporary = RecordedTemporary { id: self.next_id, label, extent, format };
        self.next_id += 1;
        self.live.insert(temporary.id);
        self.acquired.push(temporary.clone());
        temporary
    }

    fn release_temporary(&mut self, temporary: RecordedTemporary) {
        assert!(self.live.remove(&temporary.id), "double release of {}", temporary.id);
    }

    fn run_pass(&mut self, _frame: &mut (), _temporaries: &FrameTemporaries<RecordedTemporary>, request: &PassRequest<'_>) {
        self.events.push(Event::Pass {
            pass: request.pass,
            input: request.input,
            output: request.output,
            uniforms: *request.uniforms,
            noise: request.noise,
        });
    }

    fn clear_temporary(&mut self, _frame: &mut (), temporary: &RecordedTemporary) {
        self.events.push(Event::Clear { id: temporary.id });
    }

    fn render_excluded(&mut self, _frame: &mut (), camera: &ExclusionCamera, target: &RecordedTemporary) {
        self.events.push(Event::Excluded {
            camera: camera.name.clone(),
            mask: camera.culling_mask,
            target: target.id,
        });
    }

    fn blit(&mut self, _frame: &mut ()) {
        self.events.push(Event::Blit);
    }
}
