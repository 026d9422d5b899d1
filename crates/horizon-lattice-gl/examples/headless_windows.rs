//! Drive the context manager against the headless driver.
//!
//! Registers three windows, two with a shared pixel format and one with a
//! 16-bit format, renders a few frames to each and prints what the driver saw.
//!
//! Run with:
//! ```
//! cargo run --package horizon-lattice-gl --example headless_windows
//! ```

use horizon_lattice_gl::{
    GlConfig, GlManager, GlResult, HeadlessDriver, NativeInstanceHandle, PixelFormatRequest,
    WindowId,
};

fn main() -> GlResult<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let driver = HeadlessDriver::new();
    let observer = driver.clone();
    let hinstance = NativeInstanceHandle::from_raw(0x400000).expect("non-null instance handle");

    let mut manager = GlManager::new(driver, GlConfig::default());
    manager.initialize()?;

    let main = WindowId::MAIN;
    let tool = WindowId::new(1);
    let preview = WindowId::new(2);

    manager.window_create(main, observer.create_window(), hinstance, 1280, 720)?;
    manager.window_create(tool, observer.create_window(), hinstance, 300, 600)?;
    manager.window_create_with_format(
        preview,
        observer.create_window(),
        hinstance,
        640,
        360,
        &PixelFormatRequest::default().with_color_bits(16),
    )?;
    manager.set_use_vsync(main, true)?;

    for _frame in 0..3 {
        for id in manager.window_ids() {
            manager.window_make_current(id)?;
            manager.swap_buffers()?;
        }
    }
    manager.release_current();

    println!(
        "{} windows in {} display groups",
        manager.window_count(),
        manager.display_count()
    );
    for id in manager.window_ids() {
        println!(
            "  {id}: {}x{} group {} vsync {}",
            manager.window_get_width(id)?,
            manager.window_get_height(id)?,
            manager.window_display(id)?.index(),
            manager.is_using_vsync(id)?,
        );
    }

    drop(manager);
    println!("driver calls: {:#?}", observer.stats());
    Ok(())
}
