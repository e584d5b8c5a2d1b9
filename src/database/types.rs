#[derive(Clone, Debug, PartialEq)]
pub struct UserRecord {
    pub handle: String,
    pub discriminator: Option<String>,
    pub external_id: u64,
    pub points: i64,
    pub total_reviews: i64,
    pub last_submitted: Option<String>,
}

/// How a record is looked up in the ledger
#[derive(Clone, Debug)]
pub enum UserLookup {
    Id(u64),
    Name {
        handle: String,
        discriminator: Option<String>,
    },
}
