mod redeem_test;
