// PulseWatch: MAX30102 / MAX30105 Pulse-Oximeter Driver
//
// Register-level driver over I2C. Runs the part in Red+IR (SpO2) mode and
// exposes only the newest IR sample, which is all contact detection needs.

use std::thread;
use std::time::{Duration, Instant};

use esp_idf_hal::i2c::I2cDriver;

use pulsewatch::config::*;
use pulsewatch::error::SetupError;
use pulsewatch::sensor::IrSensor;

// Register addresses
const REG_FIFO_WR_PTR: u8 = 0x04;
const REG_FIFO_OVF_COUNTER: u8 = 0x05;
const REG_FIFO_RD_PTR: u8 = 0x06;
const REG_FIFO_DATA: u8 = 0x07;
const REG_FIFO_CONFIG: u8 = 0x08;
const REG_MODE_CONFIG: u8 = 0x09;
const REG_SPO2_CONFIG: u8 = 0x0A;
const REG_LED1_PA: u8 = 0x0C; // red
const REG_LED2_PA: u8 = 0x0D; // IR
const REG_PART_ID: u8 = 0xFF;
const PART_ID_EXPECTED: u8 = 0x15;

const MODE_RESET: u8 = 0x40;
const MODE_SPO2: u8 = 0x03; // red + IR
const FIFO_SMP_AVE_4: u8 = 0x40;
const FIFO_ROLLOVER_EN: u8 = 0x10;
// ADC range 4096 nA | 400 samples/s | 411 us pulse (18-bit)
const SPO2_CONFIG: u8 = 0x20 | 0x0C | 0x03;
const LED_CURRENT: u8 = 0x1F; // ~6.4 mA

const FIFO_DEPTH: usize = 32;
const BYTES_PER_SAMPLE: usize = 6; // 3 red + 3 IR
const SAMPLE_MASK: u32 = 0x3_FFFF; // 18-bit
const RESET_TIMEOUT: Duration = Duration::from_millis(100);

pub struct Max3010x<'d> {
    i2c: I2cDriver<'d>,
    last_ir: u32,
}

impl<'d> Max3010x<'d> {
    pub fn new(i2c: I2cDriver<'d>) -> Self {
        Self { i2c, last_ir: 0 }
    }

    /// Check the part id, soft-reset, then configure averaging, ADC and LEDs.
    pub fn init(&mut self) -> Result<(), SetupError> {
        let part_id = self
            .read_register(REG_PART_ID)
            .map_err(|e| SetupError::SensorInit(format!("no answer on 0x{I2C_ADDR_MAX3010X:02x}: {e}")))?;
        if part_id != PART_ID_EXPECTED {
            return Err(SetupError::SensorInit(format!("unexpected part id 0x{part_id:02x}")));
        }

        self.configure()
            .map_err(|e| SetupError::SensorInit(e.to_string()))?;

        log::info!("MAX3010x initialised (SpO2 mode, avg 4, 400 sps, 18-bit)");
        Ok(())
    }

    fn configure(&mut self) -> anyhow::Result<()> {
        self.write_register(REG_MODE_CONFIG, MODE_RESET)?;
        let started = Instant::now();
        while self.read_register(REG_MODE_CONFIG)? & MODE_RESET != 0 {
            if started.elapsed() > RESET_TIMEOUT {
                anyhow::bail!("soft reset did not complete");
            }
            thread::sleep(Duration::from_millis(1));
        }

        self.write_register(REG_FIFO_CONFIG, FIFO_SMP_AVE_4 | FIFO_ROLLOVER_EN)?;
        self.write_register(REG_MODE_CONFIG, MODE_SPO2)?;
        self.write_register(REG_SPO2_CONFIG, SPO2_CONFIG)?;
        self.write_register(REG_LED1_PA, LED_CURRENT)?;
        self.write_register(REG_LED2_PA, LED_CURRENT)?;

        // Start from an empty FIFO.
        self.write_register(REG_FIFO_WR_PTR, 0)?;
        self.write_register(REG_FIFO_OVF_COUNTER, 0)?;
        self.write_register(REG_FIFO_RD_PTR, 0)?;
        Ok(())
    }

    /// Drain the FIFO and return the newest IR value, or the previous one if
    /// nothing new arrived since the last call.
    fn read_newest_ir(&mut self) -> anyhow::Result<u32> {
        let write_ptr = self.read_register(REG_FIFO_WR_PTR)? as usize;
        let read_ptr = self.read_register(REG_FIFO_RD_PTR)? as usize;
        let overflowed = self.read_register(REG_FIFO_OVF_COUNTER)? != 0;
        // A full (overflowed) FIFO has equal pointers too.
        let pending = if overflowed {
            FIFO_DEPTH
        } else {
            (write_ptr + FIFO_DEPTH - read_ptr) % FIFO_DEPTH
        };
        if pending == 0 {
            return Ok(self.last_ir);
        }

        let mut raw = [0u8; FIFO_DEPTH * BYTES_PER_SAMPLE];
        let len = pending * BYTES_PER_SAMPLE;
        self.i2c
            .write_read(I2C_ADDR_MAX3010X, &[REG_FIFO_DATA], &mut raw[..len], I2C_TIMEOUT_TICKS)?;

        let newest = &raw[len - BYTES_PER_SAMPLE..len];
        let ir = u32::from_be_bytes([0, newest[3], newest[4], newest[5]]) & SAMPLE_MASK;
        Ok(ir)
    }

    fn read_register(&mut self, reg: u8) -> anyhow::Result<u8> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(I2C_ADDR_MAX3010X, &[reg], &mut buf, I2C_TIMEOUT_TICKS)?;
        Ok(buf[0])
    }

    fn write_register(&mut self, reg: u8, value: u8) -> anyhow::Result<()> {
        self.i2c
            .write(I2C_ADDR_MAX3010X, &[reg, value], I2C_TIMEOUT_TICKS)?;
        Ok(())
    }
}

impl IrSensor for Max3010x<'_> {
    fn read_raw_ir(&mut self) -> u32 {
        match self.read_newest_ir() {
            Ok(ir) => {
                self.last_ir = ir;
                ir
            }
            Err(e) => {
                // Treated as "no finger": the tick goes on without a record.
                log::warn!("MAX3010x read error: {}", e);
                self.last_ir = 0;
                0
            }
        }
    }
}
