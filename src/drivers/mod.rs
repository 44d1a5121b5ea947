pub mod max3010x;
