use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;

use anyhow::Result;
use fxchain::{AudioBuffer, EffectProcessor, EngineConfig, ModuleId, ProcessSpec};

/// Counts heap traffic on threads that have opted in.
struct Counting;

thread_local! {
  static ARMED: Cell<bool> = const { Cell::new(false) };
  static EVENTS: Cell<usize> = const { Cell::new(0) };
}

fn note() {
  let armed = ARMED.try_with(Cell::get).unwrap_or(false);
  if armed {
    let _ = EVENTS.try_with(|e| e.set(e.get() + 1));
  }
}

unsafe impl GlobalAlloc for Counting {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    note();
    System.alloc(layout)
  }
  unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
    note();
    System.dealloc(ptr, layout)
  }
  unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
    note();
    System.realloc(ptr, layout, new_size)
  }
}

#[global_allocator]
static GLOBAL: Counting = Counting;

/// Heap events caused by one `process` call on this thread.
fn heap_events(fx: &mut EffectProcessor, block: &mut AudioBuffer) -> usize {
  EVENTS.with(|e| e.set(0));
  ARMED.with(|a| a.set(true));
  fx.process(block);
  ARMED.with(|a| a.set(false));
  EVENTS.with(Cell::get)
}

fn loud() -> AudioBuffer { AudioBuffer::from_channels(vec![vec![0.5; 256], vec![-0.5; 256]]) }

#[test]
fn in_cycle_reset_never_touches_the_heap() -> Result<()> {
  let (mut fx, mut ctl) = EffectProcessor::new(ProcessSpec::new(48_000.0, 256, 2), EngineConfig::default())?;
  for module in ModuleId::ORDER { ctl.set_enabled(module, true); }
  let mut block = loud();
  assert_eq!(heap_events(&mut fx, &mut block), 0);

  // first reset swaps in the pristine spare
  ctl.request_reset();
  let mut block = loud();
  assert_eq!(heap_events(&mut fx, &mut block), 0);

  // the used instance is handed back on this cycle
  let mut block = loud();
  assert_eq!(heap_events(&mut fx, &mut block), 0);

  // second reset picks up the spare rebuilt by the control side
  ctl.request_reset();
  let mut block = loud();
  assert_eq!(heap_events(&mut fx, &mut block), 0);

  // two in one cycle: the reverb goes quiet instead of allocating
  ctl.request_reset();
  ctl.request_reset();
  let mut block = loud();
  assert_eq!(heap_events(&mut fx, &mut block), 0);
  ctl.maintain();
  let mut block = loud();
  assert_eq!(heap_events(&mut fx, &mut block), 0);
  Ok(())
}
