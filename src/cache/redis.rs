use redis::Commands;

use super::CacheStorage;
use crate::error::Result;

/// Redis-backed storage so convergence is remembered across processes
///
/// Tags are stored as sets named `tag:<tag>` holding the member keys.
pub struct RedisStorage {
    client: redis::Client,
}

impl RedisStorage {
    /// Open a client for `url` (e.g. `redis://127.0.0.1:6379/0`)
    ///
    /// # Errors
    ///
    /// Returns `StructureError::Cache` if the URL is invalid. No connection is made until the
    /// first operation.
    pub fn open(url: &str) -> Result<Self> {
        Ok(Self {
            client: redis::Client::open(url)?,
        })
    }

    fn connection(&self) -> Result<redis::Connection> {
        Ok(self.client.get_connection()?)
    }

    fn tag_key(tag: &str) -> String {
        format!("tag:{tag}")
    }
}

impl CacheStorage for RedisStorage {
    fn load(&self, key: &str) -> Result<Option<String>> {
        let mut con = self.connection()?;
        let value: Option<String> = con.get(key)?;
        Ok(value)
    }

    fn save(&self, key: &str, value: &str, tags: &[String]) -> Result<()> {
        let mut con = self.connection()?;
        con.set::<_, _, ()>(key, value)?;
        for tag in tags {
            con.sadd::<_, _, ()>(Self::tag_key(tag), key)?;
        }
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let mut con = self.connection()?;
        con.del::<_, ()>(key)?;
        Ok(())
    }

    fn clean_tag(&self, tag: &str) -> Result<()> {
        let mut con = self.connection()?;
        let tag_key = Self::tag_key(tag);
        let keys: Vec<String> = con.smembers(&tag_key)?;
        if !keys.is_empty() {
            con.del::<_, ()>(keys)?;
        }
        con.del::<_, ()>(tag_key)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_rejects_invalid_url() {
        assert!(RedisStorage::open("not a url").is_err());
    }

    #[test]
    fn test_tag_key_format() {
        assert_eq!(RedisStorage::tag_key("ormStructure:structure"), "tag:ormStructure:structure");
    }
}
