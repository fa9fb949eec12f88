//! Engine state: values, pending updates, callback registrations and
//! open iterators.
//!
//! [`SimKernel`] holds everything the interfaces read and write. It never
//! calls out: firing callbacks and sequencing phases is
//! [`SimEngine`](crate::SimEngine)'s job, which borrows the kernel only
//! between fires so a callback may re-enter any routine.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap, HashSet, VecDeque};

use gpi::arena::ArenaId;
use gpi_common::LogicVec;

use crate::design::{DataType, Design, ObjectId, ObjectKind, Storage};
use crate::handles::{HandleKind, RawHandle};
use crate::value::{Format, Scalar, SimValue, ValueError};
use crate::vhpi::TypeTable;

/// Which interface registered a callback. The two differ in how removal
/// behaves while the callback is executing.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Interface {
    Vpi,
    Vhpi,
}

/// When a callback fires.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Wake {
    /// At an absolute tick.
    Timed(u64),
    NextTime,
    ReadWrite,
    ReadOnly,
    ValueChange(ObjectId),
    StartOfSimulation,
    EndOfSimulation,
}

impl Wake {
    fn is_repeating(self) -> bool {
        matches!(self, Wake::ValueChange(_))
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum CbState {
    Enabled,
    /// A VPI one-shot that has run; removal still succeeds.
    Fired,
    /// A VHPI callback that will never run again.
    Mature,
}

#[derive(Clone, Debug)]
pub(crate) struct CbRecord {
    pub(crate) interface: Interface,
    pub(crate) wake: Wake,
    user_data: u64,
    pub(crate) state: CbState,
    removal_requested: bool,
}

/// How a write takes effect.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum WriteMode {
    /// Applied in the next delta cycle.
    Deposit,
    /// Applied at once; watchers see it in the next delta cycle.
    Immediate,
    /// Applied at once and held against later deposits.
    Force,
    /// Drops a force, keeping the current value.
    Release,
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum Phase {
    Idle,
    Active,
    ReadOnly,
    Finished,
}

/// Severity attached to the last routine failure.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub(crate) enum ErrorLevel {
    Warning,
    Error,
}

#[derive(Clone, PartialEq, Eq, Debug)]
pub(crate) struct EngineError {
    pub(crate) level: ErrorLevel,
    pub(crate) message: String,
}

/// Why a routine call failed.
#[derive(Debug, thiserror::Error)]
pub(crate) enum AccessError {
    #[error("invalid handle {0:#x}")]
    BadHandle(u64),
    #[error("'{0}' has no value")]
    NotAValue(String),
    #[error("'{0}' is constant")]
    Constant(String),
    #[error("write to '{0}' during the read-only phase")]
    ReadOnlyPhase(String),
    #[error("'{name}': {source}")]
    Value {
        name: String,
        #[source]
        source: ValueError,
    },
    #[error("simulation has finished")]
    Finished,
}

/// A value change scripted ahead of time.
#[derive(Debug)]
struct Stimulus {
    ticks: u64,
    seq: u64,
    object: ObjectId,
    value: Scalar,
}

impl PartialEq for Stimulus {
    fn eq(&self, other: &Self) -> bool {
        (self.ticks, self.seq) == (other.ticks, other.seq)
    }
}

impl Eq for Stimulus {}

impl PartialOrd for Stimulus {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Stimulus {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        (self.ticks, self.seq).cmp(&(other.ticks, other.seq))
    }
}

/// A value-carrying object resolved to where its value lives.
struct Target {
    holder: ObjectId,
    offset: Option<u32>,
    ty: DataType,
    storage: Storage,
    name: String,
}

/// The engine's mutable state.
pub(crate) struct SimKernel {
    pub(crate) design: Design,
    now: u64,
    stimulus: BinaryHeap<Reverse<Stimulus>>,
    stimulus_seq: u64,
    /// Deposits waiting for the next delta cycle.
    pending: Vec<(ObjectId, SimValue)>,
    /// Objects changed since the last delta cycle.
    changed: Vec<ObjectId>,
    forced: HashSet<ObjectId>,
    /// Continuous assignments keyed by their source object.
    fanout: HashMap<ObjectId, Vec<ObjectId>>,
    callbacks: BTreeMap<u32, CbRecord>,
    next_callback: u32,
    iterators: HashMap<u32, VecDeque<u64>>,
    next_iterator: u32,
    pub(crate) types: TypeTable,
    firing: Option<u32>,
    pub(crate) phase: Phase,
    pub(crate) started: bool,
    pub(crate) finish_requested: bool,
    pub(crate) stop_requested: bool,
    last_error: Option<EngineError>,
    pub(crate) max_delta_per_step: u32,
    released: u64,
}

impl SimKernel {
    pub(crate) fn new(design: Design) -> Self {
        let mut fanout: HashMap<ObjectId, Vec<ObjectId>> = HashMap::new();
        for (id, object) in design.iter() {
            if let ObjectKind::ContAssign { source, .. } = object.kind() {
                fanout.entry(*source).or_default().push(id);
            }
        }
        Self {
            design,
            now: 0,
            stimulus: BinaryHeap::new(),
            stimulus_seq: 0,
            pending: Vec::new(),
            changed: Vec::new(),
            forced: HashSet::new(),
            fanout,
            callbacks: BTreeMap::new(),
            next_callback: 1,
            iterators: HashMap::new(),
            next_iterator: 1,
            types: TypeTable::default(),
            firing: None,
            phase: Phase::Idle,
            started: false,
            finish_requested: false,
            stop_requested: false,
            last_error: None,
            max_delta_per_step: 10_000,
            released: 0,
        }
    }

    // ---- time ----

    pub(crate) fn now(&self) -> u64 {
        self.now
    }

    pub(crate) fn advance_to(&mut self, ticks: u64) {
        debug_assert!(ticks >= self.now, "cannot go back from {} to {ticks}", self.now);
        self.now = ticks;
    }

    /// Earliest tick at which a stimulus, timed callback or pending write is due.
    pub(crate) fn next_event_time(&self) -> Option<u64> {
        let timed = self
            .callbacks
            .values()
            .filter(|cb| cb.state == CbState::Enabled)
            .filter_map(|cb| match cb.wake {
                Wake::Timed(due) => Some(due),
                _ => None,
            })
            .min();
        let stimulus = self.stimulus.peek().map(|Reverse(s)| s.ticks);
        // Writes made between runs land in a step at the current time.
        let pending = self.has_pending().then_some(self.now);
        [timed, stimulus, pending].into_iter().flatten().min()
    }

    pub(crate) fn is_ended(&self) -> bool {
        self.phase == Phase::Finished
    }

    // ---- errors ----

    pub(crate) fn fail(&mut self, error: AccessError) {
        self.fail_with(ErrorLevel::Error, error.to_string());
    }

    pub(crate) fn fail_with(&mut self, level: ErrorLevel, message: String) {
        log::debug!(target: "gpi_sim", "{message}");
        self.last_error = Some(EngineError { level, message });
    }

    pub(crate) fn take_error(&mut self) -> Option<EngineError> {
        self.last_error.take()
    }

    // ---- objects ----

    pub(crate) fn object_handle(id: ObjectId) -> u64 {
        RawHandle::new(HandleKind::Object, id.as_raw()).to_raw()
    }

    pub(crate) fn object_id(&self, raw: u64) -> Option<ObjectId> {
        let id = ObjectId::from_raw(RawHandle::of_kind(raw, HandleKind::Object)?);
        self.design.object(id).map(|_| id)
    }

    fn resolve(&self, id: ObjectId) -> Result<Target, AccessError> {
        let object = self
            .design
            .object(id)
            .ok_or_else(|| AccessError::BadHandle(Self::object_handle(id)))?;
        let not_a_value = || AccessError::NotAValue(object.full_name().to_string());
        let (holder, offset) = self.design.value_holder(id).ok_or_else(not_a_value)?;
        let holder_object = self.design.object(holder).ok_or_else(not_a_value)?;
        match holder_object.kind() {
            ObjectKind::Signal { ty, storage } if ty.is_scalar() => Ok(Target {
                holder,
                offset,
                ty: if offset.is_some() { DataType::Logic } else { ty.clone() },
                storage: *storage,
                name: object.full_name().to_string(),
            }),
            _ => Err(not_a_value()),
        }
    }

    /// Reads a value-carrying object in `format`.
    pub(crate) fn read(&self, id: ObjectId, format: Format) -> Result<Scalar, AccessError> {
        let target = self.resolve(id)?;
        let value = self
            .design
            .object(target.holder)
            .and_then(|o| o.value.as_ref())
            .ok_or_else(|| AccessError::NotAValue(target.name.clone()))?;
        let result = match target.offset {
            Some(offset) => {
                let bit = value
                    .bit(offset)
                    .ok_or_else(|| AccessError::NotAValue(target.name.clone()))?;
                SimValue::Logic(LogicVec::filled(1, bit)).read(&DataType::Logic, format)
            }
            None => value.read(&target.ty, format),
        };
        result.map_err(|source| AccessError::Value {
            name: target.name,
            source,
        })
    }

    /// The type a value-carrying object is read and written as.
    pub(crate) fn value_type(&self, id: ObjectId) -> Option<DataType> {
        self.resolve(id).ok().map(|target| target.ty)
    }

    fn read_natural(&self, id: ObjectId) -> Result<Scalar, AccessError> {
        let format = Format::natural(&self.resolve(id)?.ty);
        self.read(id, format)
    }

    /// Writes a value-carrying object from the scheduler side.
    pub(crate) fn write(&mut self, id: ObjectId, scalar: &Scalar, mode: WriteMode) -> Result<(), AccessError> {
        match self.phase {
            Phase::ReadOnly => {
                let name = self.design.object(id).map(|o| o.full_name().to_string());
                return Err(AccessError::ReadOnlyPhase(name.unwrap_or_default()));
            }
            Phase::Finished => return Err(AccessError::Finished),
            Phase::Idle | Phase::Active => {}
        }
        self.drive(id, scalar, mode)
    }

    fn drive(&mut self, id: ObjectId, scalar: &Scalar, mode: WriteMode) -> Result<(), AccessError> {
        let target = self.resolve(id)?;
        if target.storage.is_const() {
            return Err(AccessError::Constant(target.name));
        }
        if mode == WriteMode::Release {
            self.forced.remove(&target.holder);
            return Ok(());
        }
        let written = SimValue::write(&target.ty, scalar).map_err(|source| AccessError::Value {
            name: target.name.clone(),
            source,
        })?;
        let value = match target.offset {
            Some(offset) => {
                let current = self.design.object(target.holder).and_then(|o| o.value.clone());
                match (current, written.bit(0)) {
                    (Some(SimValue::Logic(mut bits)), Some(bit)) => {
                        bits.set(offset, bit);
                        SimValue::Logic(bits)
                    }
                    _ => return Err(AccessError::NotAValue(target.name)),
                }
            }
            None => written,
        };
        match mode {
            WriteMode::Force => {
                self.forced.insert(target.holder);
                self.store(target.holder, value);
            }
            _ if self.forced.contains(&target.holder) => {
                log::trace!(target: "gpi_sim", "'{}' is forced; write ignored", target.name);
            }
            WriteMode::Immediate => self.store(target.holder, value),
            _ => self.pending.push((target.holder, value)),
        }
        Ok(())
    }

    /// Replaces a value, recording the holder and every bit that changed.
    fn store(&mut self, holder: ObjectId, value: SimValue) {
        let Some(object) = self.design.object_mut(holder) else {
            return;
        };
        if object.value.as_ref() == Some(&value) {
            return;
        }
        let old = object.value.replace(value.clone());
        let bits: Vec<ObjectId> = object.children().to_vec();
        self.changed.push(holder);
        for child in bits {
            let offset = match self.design.object(child).map(|o| o.kind()) {
                Some(ObjectKind::BitSelect { offset }) => *offset,
                _ => continue,
            };
            let before = old.as_ref().and_then(|v| v.bit(offset));
            if before != value.bit(offset) {
                self.changed.push(child);
            }
        }
    }

    /// Runs one delta cycle: applies pending deposits, then schedules the
    /// continuous assignments fed by whatever changed. Returns the changed
    /// objects.
    pub(crate) fn apply_delta(&mut self) -> Vec<ObjectId> {
        for (holder, value) in std::mem::take(&mut self.pending) {
            if !self.forced.contains(&holder) {
                self.store(holder, value);
            }
        }
        let mut changed = std::mem::take(&mut self.changed);
        let mut seen = HashSet::new();
        changed.retain(|id| seen.insert(*id));
        for id in &changed {
            let Some(assigns) = self.fanout.get(id).cloned() else {
                continue;
            };
            for assign in assigns {
                let Some(ObjectKind::ContAssign { target, source }) =
                    self.design.object(assign).map(|o| o.kind().clone())
                else {
                    continue;
                };
                let result = self
                    .read_natural(source)
                    .and_then(|value| self.drive(target, &value, WriteMode::Deposit));
                if let Err(e) = result {
                    log::warn!(target: "gpi_sim", "continuous assignment: {e}");
                }
            }
        }
        changed
    }

    pub(crate) fn has_pending(&self) -> bool {
        !self.pending.is_empty() || !self.changed.is_empty()
    }

    // ---- stimulus ----

    pub(crate) fn schedule(&mut self, ticks: u64, object: ObjectId, value: Scalar) {
        self.stimulus_seq += 1;
        self.stimulus.push(Reverse(Stimulus {
            ticks,
            seq: self.stimulus_seq,
            object,
            value,
        }));
    }

    /// Queues every stimulus due by `ticks` as a deposit.
    pub(crate) fn apply_stimulus(&mut self, ticks: u64) {
        while self.stimulus.peek().is_some_and(|Reverse(s)| s.ticks <= ticks) {
            let Some(Reverse(s)) = self.stimulus.pop() else {
                break;
            };
            if let Err(e) = self.drive(s.object, &s.value, WriteMode::Deposit) {
                log::warn!(target: "gpi_sim", "stimulus at {}: {e}", s.ticks);
            }
        }
    }

    // ---- callbacks ----

    pub(crate) fn register_callback(&mut self, interface: Interface, wake: Wake, user_data: u64) -> Option<u64> {
        if self.is_ended() {
            self.fail(AccessError::Finished);
            return None;
        }
        if let Wake::ValueChange(object) = wake {
            if let Err(e) = self.resolve(object) {
                self.fail(e);
                return None;
            }
        }
        let index = self.next_callback;
        self.next_callback += 1;
        self.callbacks.insert(
            index,
            CbRecord {
                interface,
                wake,
                user_data,
                state: CbState::Enabled,
                removal_requested: false,
            },
        );
        Some(RawHandle::new(HandleKind::Callback, index).to_raw())
    }

    pub(crate) fn callback(&self, raw: u64) -> Option<&CbRecord> {
        self.callbacks.get(&RawHandle::of_kind(raw, HandleKind::Callback)?)
    }

    /// Removes a registration. VHPI refuses while the callback is running
    /// and matures it once the run completes instead.
    pub(crate) fn remove_callback(&mut self, raw: u64) -> bool {
        let Some(index) = RawHandle::of_kind(raw, HandleKind::Callback) else {
            self.fail(AccessError::BadHandle(raw));
            return false;
        };
        let firing = self.firing == Some(index);
        let Some(cb) = self.callbacks.get_mut(&index) else {
            self.fail(AccessError::BadHandle(raw));
            return false;
        };
        if cb.interface == Interface::Vhpi && firing && cb.state == CbState::Enabled {
            cb.removal_requested = true;
            return false;
        }
        self.callbacks.remove(&index);
        true
    }

    /// Enabled callbacks whose wake satisfies `pred`, in registration order.
    pub(crate) fn due(&self, pred: impl Fn(Wake) -> bool) -> Vec<u32> {
        self.callbacks
            .iter()
            .filter(|(_, cb)| cb.state == CbState::Enabled && pred(cb.wake))
            .map(|(index, _)| *index)
            .collect()
    }

    /// Value-change callbacks watching any of `changed`.
    pub(crate) fn watchers(&self, changed: &[ObjectId]) -> Vec<u32> {
        let changed: HashSet<ObjectId> = changed.iter().copied().collect();
        self.due(|wake| matches!(wake, Wake::ValueChange(object) if changed.contains(&object)))
    }

    pub(crate) fn callback_records(&self) -> usize {
        self.callbacks.len()
    }

    pub(crate) fn enabled_callbacks(&self) -> usize {
        self.callbacks
            .values()
            .filter(|cb| cb.state == CbState::Enabled)
            .count()
    }

    /// Marks `index` as executing and returns its user data, if it may run.
    pub(crate) fn begin_fire(&mut self, index: u32) -> Option<u64> {
        let cb = self.callbacks.get(&index)?;
        if cb.state != CbState::Enabled {
            return None;
        }
        self.firing = Some(index);
        Some(cb.user_data)
    }

    pub(crate) fn end_fire(&mut self, index: u32) {
        self.firing = None;
        let Some(cb) = self.callbacks.get_mut(&index) else {
            return;
        };
        if !cb.wake.is_repeating() {
            cb.state = match cb.interface {
                Interface::Vpi => CbState::Fired,
                Interface::Vhpi => CbState::Mature,
            };
        } else if cb.removal_requested {
            cb.state = CbState::Mature;
        }
    }

    // ---- iterators ----

    pub(crate) fn open_iterator(&mut self, items: Vec<u64>) -> Option<u64> {
        if items.is_empty() {
            return None;
        }
        let index = self.next_iterator;
        self.next_iterator += 1;
        self.iterators.insert(index, items.into());
        Some(RawHandle::new(HandleKind::Iterator, index).to_raw())
    }

    /// Returns the next item; exhaustion frees the iterator.
    pub(crate) fn scan(&mut self, raw: u64) -> Option<u64> {
        let Some(index) = RawHandle::of_kind(raw, HandleKind::Iterator) else {
            self.fail(AccessError::BadHandle(raw));
            return None;
        };
        let next = self.iterators.get_mut(&index).and_then(VecDeque::pop_front);
        if next.is_none() {
            self.iterators.remove(&index);
        }
        next
    }

    pub(crate) fn release(&mut self, raw: u64) {
        match RawHandle::from_raw(raw) {
            Some(RawHandle {
                kind: HandleKind::Iterator,
                index,
            }) => {
                self.iterators.remove(&index);
            }
            Some(_) => self.released += 1,
            None => self.fail(AccessError::BadHandle(raw)),
        }
    }

    pub(crate) fn open_iterators(&self) -> usize {
        self.iterators.len()
    }

    pub(crate) fn released_handles(&self) -> u64 {
        self.released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::design::{DesignBuilder, Language};

    fn make_kernel() -> SimKernel {
        let mut b = DesignBuilder::new(Language::Verilog, "top");
        let top = b.root();
        let a = b.signal(top, "a", DataType::vector(3, 0), Storage::Var).unwrap();
        let y = b.signal(top, "y", DataType::vector(3, 0), Storage::Net).unwrap();
        b.signal(top, "p", DataType::Integer, Storage::Const).unwrap();
        b.assign(top, y, a).unwrap();
        SimKernel::new(b.build())
    }

    fn id(k: &SimKernel, name: &str) -> ObjectId {
        k.design.lookup(name).unwrap()
    }

    fn binstr(k: &SimKernel, name: &str) -> String {
        match k.read(id(k, name), Format::BinStr).unwrap() {
            Scalar::BinStr(s) => s,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn deposits_land_in_the_next_delta() {
        let mut k = make_kernel();
        let a = id(&k, "top.a");
        k.write(a, &Scalar::BinStr("0101".into()), WriteMode::Deposit).unwrap();
        assert_eq!(binstr(&k, "top.a"), "XXXX");
        let changed = k.apply_delta();
        assert!(changed.contains(&a));
        assert!(changed.contains(&id(&k, "top.a[0]")));
        assert!(changed.contains(&id(&k, "top.a[1]")));
        assert_eq!(binstr(&k, "top.a"), "0101");
        // The assignment follows one delta later.
        assert_eq!(binstr(&k, "top.y"), "ZZZZ");
        k.apply_delta();
        assert_eq!(binstr(&k, "top.y"), "0101");
        assert!(k.apply_delta().is_empty());
    }

    #[test]
    fn bit_writes_update_the_vector() {
        let mut k = make_kernel();
        let a = id(&k, "top.a");
        k.write(a, &Scalar::Int(0), WriteMode::Immediate).unwrap();
        let bit = id(&k, "top.a[2]");
        k.write(bit, &Scalar::BinStr("1".into()), WriteMode::Immediate).unwrap();
        assert_eq!(binstr(&k, "top.a"), "0100");
        assert_eq!(k.read(bit, Format::Int).unwrap(), Scalar::Int(1));
    }

    #[test]
    fn force_holds_until_release() {
        let mut k = make_kernel();
        let a = id(&k, "top.a");
        k.write(a, &Scalar::BinStr("1111".into()), WriteMode::Force).unwrap();
        k.write(a, &Scalar::BinStr("0000".into()), WriteMode::Deposit).unwrap();
        k.apply_delta();
        assert_eq!(binstr(&k, "top.a"), "1111");
        k.write(a, &Scalar::BinStr("0000".into()), WriteMode::Release).unwrap();
        k.write(a, &Scalar::BinStr("0000".into()), WriteMode::Deposit).unwrap();
        k.apply_delta();
        assert_eq!(binstr(&k, "top.a"), "0000");
    }

    #[test]
    fn writes_refused() {
        let mut k = make_kernel();
        let p = id(&k, "top.p");
        assert!(matches!(
            k.write(p, &Scalar::Int(3), WriteMode::Deposit),
            Err(AccessError::Constant(_))
        ));
        let a = id(&k, "top.a");
        k.phase = Phase::ReadOnly;
        assert!(matches!(
            k.write(a, &Scalar::Int(3), WriteMode::Deposit),
            Err(AccessError::ReadOnlyPhase(_))
        ));
        let root = k.design.root();
        assert!(matches!(k.read(root, Format::BinStr), Err(AccessError::NotAValue(_))));
    }

    #[test]
    fn vhpi_removal_waits_for_the_fire() {
        let mut k = make_kernel();
        let raw = k.register_callback(Interface::Vhpi, Wake::ReadWrite, 7).unwrap();
        let index = RawHandle::of_kind(raw, HandleKind::Callback).unwrap();
        assert_eq!(k.begin_fire(index), Some(7));
        assert!(!k.remove_callback(raw));
        assert_eq!(k.callback(raw).unwrap().state, CbState::Enabled);
        k.end_fire(index);
        assert_eq!(k.callback(raw).unwrap().state, CbState::Mature);
        assert!(k.remove_callback(raw));
        assert!(k.callback(raw).is_none());
    }

    #[test]
    fn vpi_removal_is_immediate() {
        let mut k = make_kernel();
        let raw = k.register_callback(Interface::Vpi, Wake::Timed(5), 1).unwrap();
        let index = RawHandle::of_kind(raw, HandleKind::Callback).unwrap();
        assert_eq!(k.next_event_time(), Some(5));
        k.begin_fire(index);
        assert!(k.remove_callback(raw));
        k.end_fire(index);
        assert!(k.callback(raw).is_none());
        assert_eq!(k.next_event_time(), None);
    }

    #[test]
    fn iterators_free_on_exhaustion() {
        let mut k = make_kernel();
        assert!(k.open_iterator(Vec::new()).is_none());
        let it = k.open_iterator(vec![10, 20]).unwrap();
        assert_eq!(k.scan(it), Some(10));
        assert_eq!(k.scan(it), Some(20));
        assert_eq!(k.open_iterators(), 1);
        assert_eq!(k.scan(it), None);
        assert_eq!(k.open_iterators(), 0);
    }

    #[test]
    fn stimulus_orders_by_time() {
        let mut k = make_kernel();
        let a = id(&k, "top.a");
        k.schedule(20, a, Scalar::BinStr("0001".into()));
        k.schedule(10, a, Scalar::BinStr("0010".into()));
        assert_eq!(k.next_event_time(), Some(10));
        k.apply_stimulus(10);
        k.apply_delta();
        assert_eq!(binstr(&k, "top.a"), "0010");
        assert_eq!(k.next_event_time(), Some(20));
    }
}
