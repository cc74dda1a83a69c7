/// Sequential source of instruction words for the host driver.
#[derive(Debug, Default)]
pub struct Fetch {
    pc: usize,
    inst_memory: Vec<u32>,
}

impl Fetch {
    pub fn new() -> Fetch {
        Fetch {
            pc: 0,
            inst_memory: Vec::new(),
        }
    }

    /// Replace the program and rewind.
    pub fn load(&mut self, inst_memory: Vec<u32>) {
        self.inst_memory = inst_memory;
        self.pc = 0;
    }

    pub fn fetch(&self) -> Option<u32> {
        self.inst_memory.get(self.pc).copied()
    }

    pub fn pc(&self) -> usize {
        self.pc
    }

    pub fn update_pc(&mut self, new_pc: usize) {
        self.pc = new_pc;
    }

    pub fn next_pc(&mut self) {
        self.update_pc(self.pc + 1);
    }

    pub fn is_empty(&self) -> bool {
        self.fetch().is_none()
    }

    pub fn len(&self) -> usize {
        self.inst_memory.len()
    }
}
