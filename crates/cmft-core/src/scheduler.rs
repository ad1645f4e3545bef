//! L4: the hybrid CPU/GPU task scheduler driving the radiance filter
//! across every face and mip.
//!
//! Grounded in `dariomanesku/cmft`'s `RadianceFilterTaskList` /
//! `radianceFilterCpu` / `imageRadianceFilter` (`cubemapfilter.cpp`): a
//! shared task list is consumed from the top (GPU, largest faces first)
//! and from the bottom (CPU threads, smallest faces first) so that the
//! expensive large mips keep the GPU busy while idle CPU cores chew
//! through cheap small mips; anything the GPU fails to finish is pushed
//! back onto a side stack and finished single-threaded.

use crate::error::{CmftError, Result};
use crate::filter::{FaceData, RadianceTask};
use std::sync::Mutex;

/// One (mip, face) unit of work: which mip/face it targets and the tasks
/// (one per destination texel) that make it up.
pub struct Unit {
    pub mip: u32,
    pub mip_idx: usize,
    pub face_idx: usize,
    pub tasks: Vec<RadianceTask>,
}

impl Unit {
    fn tasks_vec(&self) -> Vec<RadianceTask> {
        self.tasks.clone()
    }
}

struct Inner {
    top: usize,
    bottom: usize,
    unfinished: Vec<usize>,
}

/// The flattened (mip, face) unit list, read-only once built, plus a brief
/// mutex guarding only the top/bottom/unfinished claim counters. `units`
/// itself is never mutated after construction, so it sits outside the lock
/// and reading `unit(idx)` never blocks or contends with a claim — only the
/// claim bookkeeping below is serialized, keeping critical sections short
/// so the per-texel filtering work (the expensive part) runs unlocked.
///
/// `take_from_top` serves the GPU path (large, early mips first);
/// `take_from_bottom` serves CPU worker threads (small, late mips first);
/// `push_unfinished` receives work a GPU device failed partway through,
/// for CPU threads to mop up. Units are handed out by index so a claim
/// never aliases another thread's claim.
pub struct RadianceTaskList {
    units: Vec<Unit>,
    inner: Mutex<Inner>,
}

impl RadianceTaskList {
    /// `units` must be ordered by ascending mip (index 0 = largest,
    /// earliest mip), since `take_from_top` walks it front-to-back and
    /// `take_from_bottom` walks it back-to-front.
    pub fn new(units: Vec<Unit>) -> Self {
        let bottom = units.len();
        RadianceTaskList {
            units,
            inner: Mutex::new(Inner {
                top: 0,
                bottom,
                unfinished: Vec::new(),
            }),
        }
    }

    pub fn take_from_top(&self) -> Option<usize> {
        let mut inner = self.inner.lock().unwrap();
        if inner.top < inner.bottom {
            let idx = inner.top;
            inner.top += 1;
            Some(idx)
        } else {
            None
        }
    }

    pub fn take_from_bottom(&self) -> Option<usize> {
        let mut inner = self.inner.lock().unwrap();
        if inner.bottom > inner.top {
            inner.bottom -= 1;
            Some(inner.bottom)
        } else {
            None
        }
    }

    pub fn push_unfinished(&self, idx: usize) {
        self.inner.lock().unwrap().unfinished.push(idx);
    }

    pub fn pop_unfinished(&self) -> Option<usize> {
        self.inner.lock().unwrap().unfinished.pop()
    }

    /// True if any unit is still unclaimed or sitting on the unfinished
    /// stack — checked without claiming anything.
    pub fn has_remaining(&self) -> bool {
        let inner = self.inner.lock().unwrap();
        inner.top < inner.bottom || !inner.unfinished.is_empty()
    }

    fn unit(&self, idx: usize) -> &Unit {
        &self.units[idx]
    }
}

/// Per-mip filter parameters, shared read-only across worker threads.
#[derive(Clone, Copy)]
pub struct MipParams {
    pub filter_size: f32,
    pub specular_power: f32,
    pub specular_angle: f32,
}

/// GPU device seam (spec.md §9 "OpenCL coupling"). `cmft-gpu` implements
/// this against `wgpu`; the scheduler only depends on the trait, never on
/// a concrete backend, so alternate backends (or none) compile fine.
pub trait GpuBackend: Send + Sync {
    /// Uploads the source cubemap's RGBA32F texels once per filter run.
    fn upload_source(&mut self, faces: &[FaceData; 6]) -> Result<()>;

    /// Runs the filter kernel over one face's tasks at the given mip
    /// parameters, returning RGB colors in task order. A backend that
    /// hits a device error returns `Err(CmftError::DeviceFailed)`, which
    /// the caller treats as "push this face back onto CPU work".
    fn run_face(&mut self, tasks: &[RadianceTask], params: MipParams) -> Result<Vec<[f32; 3]>>;
}

/// Progress reported after each (mip, face) unit of work completes, fed
/// to an injected callback rather than a global singleton (spec.md §9).
#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub units_done: u32,
    pub units_total: u32,
}

/// One output buffer per mip, each holding RGBA32F texels for all six
/// faces back to back (`mip_face_sizes[i]^2 * 6 * 4` floats).
pub type MipOutputs = Vec<Mutex<Vec<f32>>>;

fn write_face(dst: &mut [f32], face_size: u32, face_idx: usize, tasks: &[RadianceTask], colors: &[[f32; 3]]) {
    let face_stride = (face_size * face_size * 4) as usize;
    let base = face_idx * face_stride;
    for (task, color) in tasks.iter().zip(colors) {
        let idx = base + ((task.y * face_size + task.x) * 4) as usize;
        dst[idx] = color[0];
        dst[idx + 1] = color[1];
        dst[idx + 2] = color[2];
        dst[idx + 3] = 1.0;
    }
}

fn run_unit_cpu(faces: &[FaceData; 6], unit: &Unit, params: MipParams) -> Vec<[f32; 3]> {
    unit.tasks
        .iter()
        .map(|task| {
            crate::filter::radiance_filter_texel(
                faces,
                task,
                params.filter_size,
                params.specular_power,
                params.specular_angle,
            )
        })
        .collect()
}

/// Runs the filter across every (mip, face) unit, splitting work between
/// `num_cpu_threads` CPU workers and, if present, one GPU backend.
///
/// Mirrors `imageRadianceFilter`'s dispatch: the GPU path (if any) drains
/// `take_from_top` (large, early mips) and on a device failure calls
/// `push_unfinished`; CPU worker threads drain `take_from_bottom` (small,
/// late mips) then `pop_unfinished` until both are empty. If
/// `num_cpu_threads` is `0` and the GPU path left anything unclaimed or
/// unfinished, there's nothing left to run it, so this escalates to
/// [`CmftError::InvalidParameter`] rather than silently dropping work.
pub fn run_hybrid(
    faces: &[FaceData; 6],
    task_list: RadianceTaskList,
    mip_params: &[MipParams],
    mip_face_sizes: &[u32],
    num_cpu_threads: usize,
    mut gpu: Option<&mut dyn GpuBackend>,
    on_progress: &(dyn Fn(Progress) + Sync),
) -> Result<MipOutputs> {
    let total_units = task_list.units.len() as u32;
    let outputs: MipOutputs = mip_face_sizes
        .iter()
        .map(|&size| Mutex::new(vec![0.0f32; (size * size * 6 * 4) as usize]))
        .collect();
    let done = Mutex::new(0u32);

    if let Some(backend) = gpu.as_deref_mut() {
        backend.upload_source(faces)?;

        while let Some(idx) = task_list.take_from_top() {
            let (mip_idx, face_idx, params, unit_tasks) = {
                let unit = task_list.unit(idx);
                (unit.mip_idx, unit.face_idx, mip_params[unit.mip as usize], unit.tasks_vec())
            };

            match backend.run_face(&unit_tasks, params) {
                Ok(colors) => {
                    let mut buf = outputs[mip_idx].lock().unwrap();
                    write_face(&mut buf, mip_face_sizes[mip_idx], face_idx, &unit_tasks, &colors);
                    drop(buf);

                    let mut d = done.lock().unwrap();
                    *d += 1;
                    on_progress(Progress {
                        units_done: *d,
                        units_total: total_units,
                    });
                }
                Err(_) => task_list.push_unfinished(idx),
            }
        }
    }

    if num_cpu_threads == 0 {
        if task_list.has_remaining() {
            return Err(CmftError::InvalidParameter(
                "numCpuThreads is 0 but the GPU backend left unfinished work".into(),
            ));
        }
        return Ok(outputs);
    }

    std::thread::scope(|scope| {
        for _ in 0..num_cpu_threads {
            scope.spawn(|| loop {
                let idx = task_list
                    .take_from_bottom()
                    .or_else(|| task_list.pop_unfinished());
                let Some(idx) = idx else {
                    break;
                };

                let unit = task_list.unit(idx);
                let params = mip_params[unit.mip as usize];
                let colors = run_unit_cpu(faces, unit, params);
                let (mip_idx, face_idx, unit_tasks) = (unit.mip_idx, unit.face_idx, unit.tasks_vec());

                let mut buf = outputs[mip_idx].lock().unwrap();
                write_face(&mut buf, mip_face_sizes[mip_idx], face_idx, &unit_tasks, &colors);
                drop(buf);

                let mut d = done.lock().unwrap();
                *d += 1;
                on_progress(Progress {
                    units_done: *d,
                    units_total: total_units,
                });
            });
        }
    });

    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mk_units(n: usize) -> Vec<Unit> {
        (0..n)
            .map(|i| Unit {
                mip: i as u32,
                mip_idx: i,
                face_idx: 0,
                tasks: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn top_and_bottom_never_double_claim() {
        let list = RadianceTaskList::new(mk_units(10));
        let mut claimed = std::collections::HashSet::new();
        while let Some(idx) = list.take_from_top() {
            assert!(claimed.insert(idx));
            if claimed.len() > 3 {
                break;
            }
        }
        while let Some(idx) = list.take_from_bottom() {
            assert!(claimed.insert(idx));
        }
        assert_eq!(claimed.len(), 10);
    }

    #[test]
    fn unfinished_units_are_recoverable() {
        let list = RadianceTaskList::new(mk_units(4));
        let idx = list.take_from_top().unwrap();
        list.push_unfinished(idx);
        assert_eq!(list.pop_unfinished(), Some(idx));
        assert_eq!(list.pop_unfinished(), None);
    }
}
