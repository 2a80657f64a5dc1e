/// Lua script for releasing a distributed lock.
///
/// KEYS\[1\] = lock key
/// ARGV\[1\] = owner token
///
/// Returns 1 if released, 0 if not held by this owner.
pub const LOCK_RELEASE: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
end
return 0
";

/// Lua script for extending a distributed lock's TTL.
///
/// KEYS\[1\] = lock key
/// ARGV\[1\] = owner token
/// ARGV\[2\] = new TTL in milliseconds
///
/// Returns 1 if extended, 0 if not held by this owner.
pub const LOCK_EXTEND: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('PEXPIRE', KEYS[1], ARGV[2])
end
return 0
";

/// Lua script recording one event in a sliding window.
///
/// KEYS\[1\] = history sorted set
/// ARGV\[1\] = event timestamp in milliseconds (member and score)
/// ARGV\[2\] = exclusive trim bound, already formatted as `(<floor>`
/// ARGV\[3\] = key expiry in seconds
///
/// Returns the cardinality after trimming, the new event included.
pub const WINDOW_RECORD: &str = r"
redis.call('ZADD', KEYS[1], ARGV[1], ARGV[1])
redis.call('ZREMRANGEBYSCORE', KEYS[1], 0, ARGV[2])
local count = redis.call('ZCARD', KEYS[1])
redis.call('EXPIRE', KEYS[1], ARGV[3])
return count
";
