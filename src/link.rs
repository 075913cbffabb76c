/// Byte transport to the host.
///
/// The crate stays off concrete UART types; an application implements
/// this for its serial peripheral (the reference hardware runs it at
/// 1 Mbaud with a 100 ms read timeout). Reads must be bounded: `read`
/// may block up to the link's configured timeout, never longer, and
/// `available` must not block at all.
pub trait SerialLink {
    type Error;

    /// Bytes ready to read without blocking
    fn available(&mut self) -> Result<usize, Self::Error>;

    /// Read up to `buf.len()` bytes, waiting at most the link's read
    /// timeout. Returns how many bytes were placed in `buf`.
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;

    /// Queue bytes for transmission
    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error>;
}

impl<T: SerialLink> SerialLink for &mut T {
    type Error = T::Error;

    fn available(&mut self) -> Result<usize, Self::Error> {
        T::available(self)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        T::read(self, buf)
    }

    fn write(&mut self, bytes: &[u8]) -> Result<(), Self::Error> {
        T::write(self, bytes)
    }
}
