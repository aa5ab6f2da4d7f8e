use crate::model::{LegacyDataflow, LegacyBlock, Field, Schedule, DataflowStatus};

pub struct DataflowBuilder {
    name: String,
    uuid: Option<String>,
    schedule: Option<Schedule>,
    pub blocks: Vec<LegacyBlock>, // public so tests can tweak blocks after building
}

impl DataflowBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            uuid: None,
            schedule: None,
            blocks: Vec::new(),
        }
    }

    pub fn uuid(mut self, uuid: &str) -> Self {
        self.uuid = Some(uuid.to_string());
        self
    }

    pub fn cron(mut self, cron: &str) -> Self {
        let schedule = self.schedule.get_or_insert_with(Schedule::default);
        schedule.cron = Some(cron.to_string());
        self
    }

    pub fn schedule_expression(mut self, expression: &str) -> Self {
        let schedule = self.schedule.get_or_insert_with(Schedule::default);
        schedule.schedule_expression = Some(expression.to_string());
        self
    }

    /// Starts a block; the order defaults to the number of blocks added so far.
    pub fn block(self, name: &str, kind: &str) -> BlockBuilder {
        let order = self.blocks.len() as i32;
        BlockBuilder {
            dataflow_builder: self,
            block: LegacyBlock {
                block_type_id: 0,
                name: name.to_string(),
                kind: kind.to_string(),
                order,
                is_source: false,
                fields: Vec::new(),
            },
        }
    }

    pub fn build(self) -> LegacyDataflow {
        LegacyDataflow {
            name: self.name,
            uuid: self.uuid,
            status: Some(DataflowStatus { state: Some("Live".to_string()) }),
            blocks: self.blocks,
            schedule: self.schedule,
        }
    }
}

pub struct BlockBuilder {
    dataflow_builder: DataflowBuilder,
    block: LegacyBlock,
}

impl BlockBuilder {
    pub fn order(mut self, order: i32) -> Self {
        self.block.order = order;
        self
    }

    pub fn type_id(mut self, block_type_id: i64) -> Self {
        self.block.block_type_id = block_type_id;
        self
    }

    pub fn source(mut self) -> Self {
        self.block.is_source = true;
        self
    }

    /// Adds a field addressed by both key and display name.
    pub fn field(mut self, key: &str, name: &str, value: &str) -> Self {
        self.block.fields.push(Field {
            key: Some(key.to_string()),
            name: Some(name.to_string()),
            value: Some(value.to_string()),
            possible_values: Vec::new(),
        });
        self
    }

    pub fn build(mut self) -> DataflowBuilder {
        self.dataflow_builder.blocks.push(self.block);
        self.dataflow_builder
    }
}
