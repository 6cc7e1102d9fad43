// Console LED Trigger - UART Log Mirror

use esp_idf_hal::uart::UartTxDriver;

use crate::logger::Sink;

/// Copies every log line to UART1 for a wired diagnostic console.
pub struct UartSink {
    tx: UartTxDriver<'static>,
}

impl UartSink {
    pub fn new(tx: UartTxDriver<'static>) -> Self {
        Self { tx }
    }
}

impl Sink for UartSink {
    fn write(&mut self, mut bytes: &[u8]) -> anyhow::Result<()> {
        while !bytes.is_empty() {
            let written = self.tx.write(bytes)?;
            bytes = &bytes[written..];
        }
        Ok(())
    }
}
