pub trait WindowDimensions {
    /// Drawable width in physical pixels
    fn width(&self) -> u32;
    /// Drawable height in physical pixels
    fn height(&self) -> u32;
}

#[cfg(feature = "winit")]
impl WindowDimensions for winit::window::Window {
    fn width(&self) -> u32 {
        self.inner_size().width
    }

    fn height(&self) -> u32 {
        self.inner_size().height
    }
}
