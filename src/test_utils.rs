use embedded_hal::i2c::{Error, ErrorKind, ErrorType, NoAcknowledgeSource, Operation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FakeI2cError(pub ErrorKind);

impl Error for FakeI2cError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// One completed bus transaction: the target address and every byte written,
/// in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    pub address: u8,
    pub data: heapless::Vec<u8, 32>,
}

impl Transaction {
    pub fn register(&self) -> u8 {
        self.data[0]
    }

    pub fn payload(&self) -> &[u8] {
        &self.data[1..]
    }
}

/// Recording bus implementing both the blocking and the async `I2c` traits.
/// Holds at most `N` transactions.
pub struct FakeI2cBus<const N: usize> {
    pub transactions: heapless::Vec<Transaction, N>,
    pub attempts: usize,
    pub fail_next: bool,
    pub fail_all: bool,
    pub absent: heapless::Vec<u8, 128>,
    pub broken: heapless::Vec<u8, 8>,
}

impl<const N: usize> ErrorType for FakeI2cBus<N> {
    type Error = FakeI2cError;
}

impl<const N: usize> FakeI2cBus<N> {
    pub fn new() -> Self {
        Self {
            transactions: heapless::Vec::new(),
            attempts: 0,
            fail_next: false,
            fail_all: false,
            absent: heapless::Vec::new(),
            broken: heapless::Vec::new(),
        }
    }

    /// Bus on which only `present` acknowledge, `broken` report a bus error,
    /// and every other 7-bit address is silent.
    pub fn with_devices(present: &[u8], broken: &[u8]) -> Self {
        let mut bus = Self::new();

        for address in 0..0x80 {
            if !present.contains(&address) && !broken.contains(&address) {
                bus.absent.push(address).unwrap();
            }
        }
        bus.broken = heapless::Vec::from_slice(broken).unwrap();

        bus
    }

    pub fn transactions(&self) -> &[Transaction] {
        self.transactions.as_slice()
    }

    /// Every written byte of every transaction, concatenated
    pub fn write_data(&self) -> heapless::Vec<u8, 256> {
        let mut data = heapless::Vec::new();
        for transaction in &self.transactions {
            data.extend_from_slice(&transaction.data).unwrap();
        }
        data
    }

    fn record(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), FakeI2cError> {
        self.attempts += 1;

        if self.absent.contains(&address) {
            return Err(FakeI2cError(ErrorKind::NoAcknowledge(
                NoAcknowledgeSource::Address,
            )));
        }

        if self.broken.contains(&address) {
            return Err(FakeI2cError(ErrorKind::Bus));
        }

        if self.fail_all || self.fail_next {
            self.fail_next = false;
            return Err(FakeI2cError(ErrorKind::ArbitrationLoss));
        }

        let mut data = heapless::Vec::new();
        for operation in operations {
            match operation {
                Operation::Write(write) => {
                    data.extend_from_slice(write)
                        .map_err(|_| FakeI2cError(ErrorKind::Overrun))?;
                }
                Operation::Read(read) => read.fill(0),
            }
        }

        self.transactions
            .push(Transaction { address, data })
            .map_err(|_| FakeI2cError(ErrorKind::Overrun))?;

        Ok(())
    }
}

impl<const N: usize> embedded_hal::i2c::I2c for FakeI2cBus<N> {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.record(address, operations)
    }
}

impl<const N: usize> embedded_hal_async::i2c::I2c for FakeI2cBus<N> {
    async fn transaction(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        self.record(address, operations)
    }
}

/// Delay that only adds up how long it was asked to wait
#[derive(Debug, Default)]
pub struct FakeDelay {
    pub total_ns: u64,
}

impl embedded_hal::delay::DelayNs for FakeDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}

impl embedded_hal_async::delay::DelayNs for FakeDelay {
    async fn delay_ns(&mut self, ns: u32) {
        self.total_ns += u64::from(ns);
    }
}
